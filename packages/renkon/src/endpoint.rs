//! Declarative endpoints and the endpoint registry.
//!
//! An endpoint is a (method, path) pair with a fixed catalogue of canned
//! responses, each keyed by a [`ResponseId`]. Responses are either static
//! (content fixed at declaration) or dynamic (content produced by a closure
//! given the request and context). Endpoints are immutable once registered
//! and the registry is frozen for the server's running lifetime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;

use crate::builder::ListBuilder;
use crate::codec::{default_codec, BodyCodec};
use crate::content_type::ContentType;
use crate::error::{ActionError, RegistrationError};
use crate::id::{EndpointId, ResponseId};
use crate::message::{Context, MockRequest, MockResponse};

/// Closure producing a response from the live request.
pub type DynamicResponse =
    Arc<dyn Fn(&MockRequest, &Context) -> Result<MockResponse, ActionError> + Send + Sync>;

/// A canned response: fixed at declaration or produced per request.
#[derive(Clone)]
pub enum ResponseFactory {
    /// Content fixed at declaration time.
    Static(MockResponse),
    /// Content produced by a closure given `(request, context)`.
    Dynamic(DynamicResponse),
}

impl ResponseFactory {
    /// Produces the response for this request.
    pub fn produce(
        &self,
        request: &MockRequest,
        context: &Context,
    ) -> Result<MockResponse, ActionError> {
        match self {
            ResponseFactory::Static(response) => Ok(response.clone()),
            ResponseFactory::Dynamic(factory) => factory(request, context),
        }
    }
}

impl fmt::Debug for ResponseFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFactory::Static(response) => {
                f.debug_tuple("Static").field(&response.id).finish()
            }
            ResponseFactory::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A declarative endpoint. Immutable once registered.
#[derive(Debug, Clone)]
pub struct Endpoint {
    id: EndpointId,
    method: Method,
    pattern: String,
    description: Option<String>,
    responses: HashMap<ResponseId, ResponseFactory>,
    request_content_type: ContentType,
    response_content_type: ContentType,
    codec: Arc<dyn BodyCodec>,
}

impl Endpoint {
    /// Declares an endpoint with explicit content-type tags.
    ///
    /// The id defaults to `"<METHOD>-<path>"`; no two registered endpoints
    /// may share one, which also keeps (method, path) pairs unique.
    pub fn new(
        method: Method,
        pattern: impl Into<String>,
        request_content_type: ContentType,
        response_content_type: ContentType,
    ) -> Self {
        let pattern = pattern.into();
        let id = EndpointId::new(format!("{method}-{pattern}"));
        Self {
            id,
            method,
            codec: default_codec(response_content_type),
            pattern,
            description: None,
            responses: HashMap::new(),
            request_content_type,
            response_content_type,
        }
    }

    /// Declares a JSON endpoint (JSON request and response).
    pub fn json(method: Method, pattern: impl Into<String>) -> Self {
        Self::new(method, pattern, ContentType::Json, ContentType::Json)
    }

    /// Declares a protobuf unary endpoint (gRPC wire variants, POST).
    pub fn grpc(pattern: impl Into<String>) -> Self {
        Self::new(
            Method::POST,
            pattern,
            ContentType::Protobuf,
            ContentType::Protobuf,
        )
    }

    /// Overrides the derived id.
    pub fn with_id(mut self, id: impl Into<EndpointId>) -> Self {
        self.id = id.into();
        self
    }

    /// Attaches a human description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a static response, keyed by the response's own id.
    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.responses
            .insert(response.id.clone(), ResponseFactory::Static(response));
        self
    }

    /// Adds a dynamic response under `id`.
    pub fn with_dynamic_response<F>(mut self, id: impl Into<ResponseId>, factory: F) -> Self
    where
        F: Fn(&MockRequest, &Context) -> Result<MockResponse, ActionError> + Send + Sync + 'static,
    {
        self.responses
            .insert(id.into(), ResponseFactory::Dynamic(Arc::new(factory)));
        self
    }

    /// Replaces the body codec for this endpoint.
    pub fn with_codec(mut self, codec: Arc<dyn BodyCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// The endpoint id.
    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path pattern this endpoint was declared with.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The human description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The request content-type tag.
    pub fn request_content_type(&self) -> ContentType {
        self.request_content_type
    }

    /// The response content-type tag.
    pub fn response_content_type(&self) -> ContentType {
        self.response_content_type
    }

    /// The body codec.
    pub fn codec(&self) -> &dyn BodyCodec {
        self.codec.as_ref()
    }

    /// Looks up a response factory by id.
    pub fn response(&self, id: &ResponseId) -> Option<&ResponseFactory> {
        self.responses.get(id)
    }

    /// The registered response ids.
    pub fn response_ids(&self) -> impl Iterator<Item = &ResponseId> {
        self.responses.keys()
    }
}

/// Registration-ordered endpoint collection.
///
/// Ordering matters: route patterns are installed in registration order and
/// the matcher's first-registered-wins tie-break depends on it.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Arc<Endpoint>>,
    by_id: HashMap<EndpointId, usize>,
}

impl EndpointRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an endpoint, enforcing id uniqueness.
    pub fn insert(&mut self, endpoint: Endpoint) -> Result<(), RegistrationError> {
        if self.by_id.contains_key(endpoint.id()) {
            return Err(RegistrationError::DuplicateEndpoint(endpoint.id().clone()));
        }
        let endpoint = Arc::new(endpoint);
        self.by_id
            .insert(endpoint.id().clone(), self.endpoints.len());
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Looks an endpoint up by id.
    pub fn get(&self, id: &EndpointId) -> Option<&Arc<Endpoint>> {
        self.by_id.get(id).map(|index| &self.endpoints[*index])
    }

    /// Iterates endpoints in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Endpoint>> {
        self.endpoints.iter()
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Accumulating builder for endpoint declarations.
pub type EndpointsBuilder = ListBuilder<Endpoint>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_is_derived_from_method_and_path() {
        let endpoint = Endpoint::json(Method::GET, "/accounts");
        assert_eq!(endpoint.id().as_str(), "GET-/accounts");
    }

    #[test]
    fn test_id_override() {
        let endpoint = Endpoint::json(Method::GET, "/accounts").with_id("accounts");
        assert_eq!(endpoint.id().as_str(), "accounts");
    }

    #[test]
    fn test_registry_rejects_duplicate_ids() {
        let mut registry = EndpointRegistry::new();
        registry
            .insert(Endpoint::json(Method::GET, "/accounts"))
            .unwrap();
        let err = registry
            .insert(Endpoint::json(Method::GET, "/accounts"))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateEndpoint(_)));
    }

    #[test]
    fn test_static_responses_are_reproduced_verbatim() {
        let endpoint = Endpoint::json(Method::GET, "/accounts")
            .with_response(MockResponse::json("zero", json!([{"balance": 0}])));
        let factory = endpoint.response(&ResponseId::from("zero")).unwrap();
        assert!(matches!(factory, ResponseFactory::Static(_)));
        assert!(endpoint.response(&ResponseId::from("missing")).is_none());
    }

    #[test]
    fn test_grpc_endpoints_are_post_protobuf() {
        let endpoint = Endpoint::grpc("/bank.Accounts/List");
        assert_eq!(endpoint.method(), &Method::POST);
        assert_eq!(endpoint.request_content_type(), ContentType::Protobuf);
        assert_eq!(endpoint.response_content_type(), ContentType::Protobuf);
    }
}
