//! The action pipeline engine.
//!
//! A [`Pipeline`] is the per-(session, endpoint) cursor over a scenario's
//! action list. An [`EndpointResponder`] owns the pipelines for one
//! endpoint, keyed by session id.
//!
//! Each pipeline is an exclusion domain of its own: its compatibility
//! check and `handle` are linearized behind a per-pipeline lock, while
//! distinct pipelines proceed in parallel. The responder's map is guarded
//! separately and only long enough to fetch or insert an entry, so a slow
//! action in one session never blocks another session.

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::IntoResponse;
use tokio::sync::Mutex;

use crate::action::{ActionConfiguration, ActionTypeTable};
use crate::endpoint::Endpoint;
use crate::error::{PipelineError, RequestError};
use crate::id::SessionId;
use crate::message::{Context, MockRequest, MockResponse};
use crate::path::{Path, PathCaptures};
use crate::scenario::Scenario;

/// Per-(session, endpoint) cursor over an action configuration list.
pub struct Pipeline {
    session: SessionId,
    types: Arc<ActionTypeTable>,
    configured: Vec<ActionConfiguration>,
    cursor: usize,
}

impl Pipeline {
    /// A fresh pipeline with the cursor at the pre-wrap sentinel, so the
    /// first request's advance lands on index 0.
    pub fn new(
        session: SessionId,
        configured: Vec<ActionConfiguration>,
        types: Arc<ActionTypeTable>,
    ) -> Self {
        let cursor = configured.len();
        Self {
            session,
            types,
            configured,
            cursor,
        }
    }

    /// The session this pipeline belongs to.
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// The current cursor position. Equals the list length until the first
    /// request advances it.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether this pipeline was built from an action list structurally
    /// equal to `actions`.
    pub fn is_compatible(&self, actions: &[ActionConfiguration]) -> bool {
        self.configured == actions
    }

    /// Replaces the configured list and resets the cursor to the pre-wrap
    /// sentinel. Equivalent to discarding and rebuilding the pipeline.
    pub fn reconfigure(&mut self, actions: Vec<ActionConfiguration>) {
        self.configured = actions;
        self.cursor = self.configured.len();
    }

    /// Handles one request.
    ///
    /// The cursor advances exactly once per request, selecting the
    /// request's starting action; consecutive requests from one session
    /// therefore start on consecutive actions. Actions that return no
    /// response are consumed within the same request — execution walks
    /// forward through the list until one responds — and a full loop
    /// back to the starting action without a response is a
    /// pipeline-looped failure. The advance is never rolled back: a
    /// cancelled request leaves it in place, so behavior stays a
    /// function of arrival order and scenario configuration.
    pub async fn handle(
        &mut self,
        request: &MockRequest,
        context: &Context,
    ) -> Result<MockResponse, PipelineError> {
        if self.configured.is_empty() {
            return Err(PipelineError::NoActionsConfigured);
        }

        self.cursor = if self.cursor + 1 >= self.configured.len() {
            0
        } else {
            self.cursor + 1
        };
        let started = self.cursor;

        let mut index = started;
        loop {
            let action = self.types.instantiate(&self.configured[index])?;
            if let Some(response) = action.perform(request, context).await? {
                return Ok(response);
            }

            index = (index + 1) % self.configured.len();
            if index == started {
                return Err(PipelineError::Looped);
            }
        }
    }
}

/// Routes one endpoint's requests into per-session pipelines.
pub struct EndpointResponder {
    endpoint: Arc<Endpoint>,
    types: Arc<ActionTypeTable>,
    pipelines: Mutex<HashMap<SessionId, Arc<Mutex<Pipeline>>>>,
}

impl EndpointResponder {
    /// A responder with no pipelines yet; they are created lazily on the
    /// first request per session.
    pub fn new(endpoint: Arc<Endpoint>, types: Arc<ActionTypeTable>) -> Self {
        Self {
            endpoint,
            types,
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    /// The endpoint this responder serves.
    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }

    /// Answers a routed transport request.
    pub async fn respond(
        &self,
        request: axum::extract::Request,
        captures: PathCaptures,
    ) -> axum::response::Response {
        match self.try_respond(request, captures).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(endpoint = %self.endpoint.id(), %error, "request failed");
                error.into_response()
            }
        }
    }

    async fn try_respond(
        &self,
        request: axum::extract::Request,
        captures: PathCaptures,
    ) -> Result<axum::response::Response, RequestError> {
        let (parts, body) = request.into_parts();

        let scenario = parts
            .extensions
            .get::<Arc<Scenario>>()
            .cloned()
            .ok_or(RequestError::SelectionMissing("scenario"))?;
        let session = parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or(RequestError::SelectionMissing("session"))?;

        let offered = parts
            .headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let negotiated = self
            .endpoint
            .request_content_type()
            .negotiate(offered, self.endpoint.id())?;

        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|error| RequestError::BodyRead(error.to_string()))?;
        let content = self
            .endpoint
            .codec()
            .decode(body.clone())
            .map_err(RequestError::Decode)?;

        let mock_request = MockRequest {
            method: parts.method,
            path: Path::new(parts.uri.path()),
            headers: parts.headers,
            media_type: negotiated,
            captures,
            body,
            content,
        };
        let context = Context::new(self.endpoint.clone(), scenario.clone(), session.clone());

        let actions = scenario
            .actions_for(self.endpoint.id())
            .ok_or_else(|| PipelineError::EndpointNotInScenario {
                endpoint: self.endpoint.id().clone(),
                scenario: scenario.id.clone(),
            })?;

        // The scenario-wide delay runs before pipeline entry; a `wait`
        // action inside the pipeline is independent of it.
        if let Some(delay) = scenario.options.delay_all_requests {
            if !delay.is_zero() {
                tokio::time::sleep(delay.to_std()).await;
            }
        }

        let pipeline = self.pipeline_for(&session, actions).await;
        let mut pipeline = pipeline.lock().await;
        if !pipeline.is_compatible(actions) {
            tracing::debug!(
                endpoint = %self.endpoint.id(),
                session = %session,
                "scenario actions changed, rebuilding pipeline"
            );
            pipeline.reconfigure(actions.to_vec());
        }

        let response = pipeline.handle(&mock_request, &context).await?;

        response
            .into_http(
                self.endpoint
                    .response_content_type()
                    .default_media_type_for(negotiated),
                self.endpoint.codec(),
            )
            .map_err(RequestError::Encode)
    }

    async fn pipeline_for(
        &self,
        session: &SessionId,
        actions: &[ActionConfiguration],
    ) -> Arc<Mutex<Pipeline>> {
        let mut pipelines = self.pipelines.lock().await;
        pipelines
            .entry(session.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Pipeline::new(
                    session.clone(),
                    actions.to_vec(),
                    self.types.clone(),
                )))
            })
            .clone()
    }

    /// Number of live per-session pipelines. Exposed for tests.
    pub async fn pipeline_count(&self) -> usize {
        self.pipelines.lock().await.len()
    }
}
