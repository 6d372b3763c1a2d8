//! # Renkon
//!
//! An embeddable mock API server: describe HTTP/gRPC endpoints, the canned
//! responses each endpoint can produce, and **scenarios** that determine
//! which response an endpoint produces on a given call. Clients select a
//! scenario by header; a per-(session, endpoint) action pipeline advances
//! deterministically through the scenario's action list and yields a
//! response.
//!
//! ## Architecture
//!
//! ```text
//! transport (axum)
//!     │
//!     ▼ x-renkon-scenario
//! scenario selection ──► 403 when unknown / unselected
//!     │
//!     ▼ x-renkon-session
//! session selection ──► minted UUIDv4 when absent
//!     │
//!     ▼ ordered path matcher, first registered wins
//! endpoint responder
//!     │
//!     ▼ per-session pipeline (exclusion domain)
//! action loop: advance ─► perform ─► respond / defer / fail
//!     │
//!     ▼ body codec + content-type defaulting
//! response
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Endpoints and action types freeze at `run()`** — scenarios stay
//!    mutable, including while serving.
//! 2. **One cursor per (session, endpoint)** — consecutive requests from a
//!    session advance round-robin; deferring actions are consumed within
//!    the same request.
//! 3. **Structural compatibility** — a pipeline is rebuilt exactly when
//!    its endpoint's action list changed structurally.
//! 4. **Nothing is silently swallowed** — every failure surfaces with the
//!    taxonomy's status and a reason.
//!
//! ## Example
//!
//! ```no_run
//! use axum::http::Method;
//! use renkon::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), renkon::error::ServerError> {
//!     let server = Renkon::with_defaults();
//!     server.add_endpoint(
//!         Endpoint::json(Method::GET, "/accounts")
//!             .with_response(MockResponse::json("empty", json!([]))),
//!     )?;
//!     server
//!         .set_default_scenario(
//!             Scenario::new("default")
//!                 .with_actions("GET-/accounts", vec![ReturnResponse::configuration("empty")]),
//!         )
//!         .await;
//!     server.run().await
//! }
//! ```

pub mod action;
pub mod actions;
pub mod builder;
pub mod codec;
pub mod content_type;
pub mod delay;
pub mod endpoint;
pub mod error;
pub mod id;
pub mod message;
pub mod middleware;
pub mod path;
pub mod pipeline;
pub mod scenario;
pub mod server;
pub mod value;

/// The types most embedders need.
pub mod prelude {
    pub use crate::action::{Action, ActionConfiguration, ActionType, ActionsBuilder};
    pub use crate::actions::{ReturnResponse, Wait};
    pub use crate::content_type::{ContentType, MediaType};
    pub use crate::delay::Delay;
    pub use crate::endpoint::{Endpoint, EndpointsBuilder, ResponseFactory};
    pub use crate::id::{ActionId, EndpointId, ResponseId, ScenarioId, SessionId};
    pub use crate::message::{Context, MockRequest, MockResponse};
    pub use crate::scenario::{Scenario, ScenarioOptions, ScenariosBuilder};
    pub use crate::server::{Renkon, ServerConfig, ShutdownHandle};
    pub use crate::value::{Boxable, BoxedValue};
}

pub use prelude::*;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
