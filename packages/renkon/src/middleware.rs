//! Scenario- and session-selection middleware.
//!
//! Both run before routing so that routing targets already know their
//! scenario and session. The selected scenario and session travel in the
//! request's extensions, the same way the transport layer attaches
//! per-request authentication elsewhere.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::id::SessionId;
use crate::scenario::ScenarioRegistry;

/// Request header selecting the active scenario.
pub const SCENARIO_HEADER: &str = "x-renkon-scenario";

/// Request header selecting the session.
pub const SESSION_HEADER: &str = "x-renkon-session";

/// Attaches the active scenario to the request, or fails with 403.
///
/// A present header must name a registered scenario; an absent header uses
/// the default scenario when one is configured.
pub async fn select_scenario(
    State(registry): State<ScenarioRegistry>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(SCENARIO_HEADER)
        .and_then(|value| value.to_str().ok());

    match registry.resolve(header).await {
        Ok(scenario) => {
            debug!(scenario = %scenario.id, "scenario selected");
            request.extensions_mut().insert(scenario);
            next.run(request).await
        }
        Err(error) => error.into_response(),
    }
}

/// Attaches the session id to the request.
///
/// The header value is used verbatim when present; otherwise a fresh
/// UUIDv4 is minted. The minted id is not reflected back in a response
/// header; surrounding transport middleware may choose to.
pub async fn select_session(mut request: Request, next: Next) -> Response {
    let session = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(SessionId::from)
        .unwrap_or_else(SessionId::mint);

    debug!(session = %session, "session selected");
    request.extensions_mut().insert(session);
    next.run(request).await
}
