//! Structured error types and their HTTP surfaces.
//!
//! Each error family is a pattern-matchable `thiserror` enum; nothing is
//! silently swallowed. Errors that surface to a client render as a JSON
//! body `{"error": <kind>, "reason": <text>}` with the status mandated by
//! the taxonomy. `anyhow::Error` is accepted at the user-action seam only
//! and never crosses the wire with its internal detail chain.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::id::{ActionId, EndpointId, ResponseId, ScenarioId};
use crate::middleware::SCENARIO_HEADER;

/// Failures of the scenario-selection middleware. Both surface as 403.
#[derive(Debug, Error)]
pub enum ScenarioSelectionError {
    /// No scenario header and no default scenario configured.
    #[error("no scenario selected: set the '{SCENARIO_HEADER}' header or configure a default scenario")]
    HeaderMissing,

    /// The scenario header names an unregistered scenario.
    #[error("scenario '{0}' does not exist")]
    Unknown(String),
}

impl ScenarioSelectionError {
    fn kind(&self) -> &'static str {
        match self {
            ScenarioSelectionError::HeaderMissing => "scenario-header-missing",
            ScenarioSelectionError::Unknown(_) => "scenario-unknown",
        }
    }
}

impl IntoResponse for ScenarioSelectionError {
    fn into_response(self) -> Response {
        error_body(StatusCode::FORBIDDEN, self.kind(), self.to_string())
    }
}

/// Failures raised while constructing or performing an action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required configuration key is absent.
    #[error("configuration property '{key}' is missing")]
    PropertyMissing {
        /// The absent key.
        key: String,
    },

    /// A configuration key is present but cannot be unboxed.
    #[error("configuration property '{key}' cannot be unboxed as {expected}")]
    TypeMismatch {
        /// The offending key.
        key: String,
        /// Human name of the expected type.
        expected: &'static str,
    },

    /// `return-response` named an id absent from the endpoint's table.
    #[error("response '{response}' is not registered on endpoint '{endpoint}'")]
    ResponseNotFound {
        /// The requested response id.
        response: ResponseId,
        /// The endpoint whose table was consulted.
        endpoint: EndpointId,
    },

    /// A user-supplied action or dynamic response factory failed.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    fn kind(&self) -> &'static str {
        match self {
            ActionError::PropertyMissing { .. } => "configuration-property-missing",
            ActionError::TypeMismatch { .. } => "configuration-type-mismatch",
            ActionError::ResponseNotFound { .. } => "response-not-found",
            ActionError::Other(_) => "action-failed",
        }
    }
}

/// Failures of the pipeline engine proper.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The scenario's action list for this endpoint is empty.
    #[error("no actions configured for this endpoint in the selected scenario")]
    NoActionsConfigured,

    /// The scenario has no action list for this endpoint at all.
    #[error("scenario '{scenario}' has no action list for endpoint '{endpoint}'")]
    EndpointNotInScenario {
        /// The routed endpoint.
        endpoint: EndpointId,
        /// The selected scenario.
        scenario: ScenarioId,
    },

    /// A configured action id is absent from the action-type table.
    #[error("action type '{0}' is not registered")]
    UnknownActionType(ActionId),

    /// A full loop over the action list produced no response.
    #[error("pipeline looped through all actions without producing a response")]
    Looped,

    /// An action failed while being constructed or performed.
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl PipelineError {
    fn status(&self) -> StatusCode {
        match self {
            PipelineError::NoActionsConfigured => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PipelineError::NoActionsConfigured => "no-actions-configured",
            PipelineError::EndpointNotInScenario { .. } => "endpoint-not-in-scenario",
            PipelineError::UnknownActionType(_) => "unknown-action-type",
            PipelineError::Looped => "pipeline-looped",
            PipelineError::Action(action) => action.kind(),
        }
    }
}

/// Encode/decode failures at the body codec boundary.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A request or response body is not valid for its content type.
    #[error("invalid {content_type} body: {source}")]
    InvalidBody {
        /// Canonical content-type name.
        content_type: &'static str,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A response's content cannot be represented in the negotiated type.
    #[error("cannot encode {content} content as {content_type}")]
    Unrepresentable {
        /// What the response carried.
        content: &'static str,
        /// Canonical content-type name.
        content_type: &'static str,
    },
}

/// Everything that can go wrong answering a routed request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request's `Content-Type` is outside the endpoint's supported set.
    #[error("endpoint '{endpoint}' does not accept content type '{offered}'")]
    UnsupportedMediaType {
        /// The routed endpoint.
        endpoint: EndpointId,
        /// The offered header value.
        offered: String,
    },

    /// The request body could not be read from the transport.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// The request body failed to decode.
    #[error("failed to decode request body: {0}")]
    Decode(#[source] CodecError),

    /// The produced response failed to encode.
    #[error("failed to encode response body: {0}")]
    Encode(#[source] CodecError),

    /// The pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The selection middlewares did not run before routing.
    #[error("request reached the responder without a {0} selection")]
    SelectionMissing(&'static str),
}

impl RequestError {
    /// The surface status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RequestError::BodyRead(_) => StatusCode::BAD_REQUEST,
            RequestError::Decode(_) => StatusCode::BAD_REQUEST,
            RequestError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::Pipeline(pipeline) => pipeline.status(),
            RequestError::SelectionMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RequestError::UnsupportedMediaType { .. } => "unsupported-media-type",
            RequestError::BodyRead(_) => "codec-error",
            RequestError::Decode(_) | RequestError::Encode(_) => "codec-error",
            RequestError::Pipeline(pipeline) => pipeline.kind(),
            RequestError::SelectionMissing(_) => "selection-missing",
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        error_body(self.status(), self.kind(), self.to_string())
    }
}

/// Failures of the registration and lifecycle API.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// `add_endpoint` after route installation.
    #[error("cannot add endpoints while running")]
    EndpointsWhileRunning,

    /// `add_action` after route installation.
    #[error("cannot add actions while running")]
    ActionsWhileRunning,

    /// Two endpoints share an id (hence a method/path pair).
    #[error("endpoint '{0}' is already registered")]
    DuplicateEndpoint(EndpointId),

    /// Two action types share an id.
    #[error("action type '{0}' is already registered")]
    DuplicateAction(ActionId),

    /// Routes were already installed; `run()` must not be re-entered.
    #[error("routes are already installed")]
    AlreadyStarted,
}

/// Failures of `run`/`serve`.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Lifecycle misuse.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Bind or transport failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub(crate) fn error_body(status: StatusCode, kind: &str, reason: String) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": kind, "reason": reason })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_statuses_follow_the_taxonomy() {
        assert_eq!(
            RequestError::from(PipelineError::NoActionsConfigured).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RequestError::from(PipelineError::Looped).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RequestError::from(PipelineError::UnknownActionType(ActionId::from("nope"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_decode_is_client_error_encode_is_server_error() {
        let decode = RequestError::Decode(CodecError::Unrepresentable {
            content: "bytes",
            content_type: "application/json",
        });
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);

        let encode = RequestError::Encode(CodecError::Unrepresentable {
            content: "bytes",
            content_type: "application/json",
        });
        assert_eq!(encode.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_scenario_reason_names_the_id() {
        let reason = ScenarioSelectionError::Unknown("ghost".into()).to_string();
        assert!(reason.contains("'ghost' does not exist"));
    }

    #[test]
    fn test_missing_header_reason_names_the_header() {
        let reason = ScenarioSelectionError::HeaderMissing.to_string();
        assert!(reason.contains("x-renkon-scenario"));
    }
}
