//! Request/response envelopes and the per-request context.

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::codec::{BodyCodec, Content};
use crate::content_type::MediaType;
use crate::endpoint::Endpoint;
use crate::error::CodecError;
use crate::id::{ResponseId, SessionId};
use crate::path::{Path, PathCaptures};
use crate::scenario::Scenario;

/// A decoded request as seen by actions and response factories.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// HTTP method.
    pub method: Method,
    /// The request path.
    pub path: Path,
    /// All request headers.
    pub headers: HeaderMap,
    /// The negotiated wire variant.
    pub media_type: MediaType,
    /// Segments bound by the matched pattern's parameters.
    pub captures: PathCaptures,
    /// The raw body bytes.
    pub body: Bytes,
    /// The decoded body content.
    pub content: Content,
}

impl MockRequest {
    /// Creates a bodyless request envelope.
    pub fn new(method: Method, path: impl Into<Path>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            media_type: MediaType::Json,
            captures: PathCaptures::default(),
            body: Bytes::new(),
            content: Content::Empty,
        }
    }

    /// A header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Deserializes the decoded JSON content.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        match &self.content {
            Content::Json(value) => {
                serde_json::from_value(value.clone()).map_err(|source| CodecError::InvalidBody {
                    content_type: "application/json",
                    source,
                })
            }
            Content::Empty => serde_json::from_value(serde_json::Value::Null).map_err(|source| {
                CodecError::InvalidBody {
                    content_type: "application/json",
                    source,
                }
            }),
            Content::Bytes(_) => Err(CodecError::Unrepresentable {
                content: "bytes",
                content_type: "application/json",
            }),
        }
    }
}

/// A canned or dynamically produced response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The response id within its endpoint's table.
    pub id: ResponseId,
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response trailers (surfaced for gRPC endpoints).
    pub trailers: HeaderMap,
    /// Body content, encoded by the endpoint's codec on the way out.
    pub content: Content,
    /// Explicit outgoing variant; defaults to the endpoint's canonical
    /// response type when unset.
    pub content_type: Option<MediaType>,
}

impl MockResponse {
    /// An empty 200 response.
    pub fn new(id: impl Into<ResponseId>) -> Self {
        Self {
            id: id.into(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            trailers: HeaderMap::new(),
            content: Content::Empty,
            content_type: None,
        }
    }

    /// A 200 response with a JSON body.
    pub fn json(id: impl Into<ResponseId>, body: serde_json::Value) -> Self {
        Self::new(id).with_content(Content::Json(body))
    }

    /// A 200 response with a raw byte body.
    pub fn bytes(id: impl Into<ResponseId>, body: impl Into<Bytes>) -> Self {
        Self::new(id).with_content(Content::Bytes(body.into()))
    }

    /// Replaces the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Replaces the body content.
    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds a trailer. Invalid names or values are ignored.
    pub fn with_trailer(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.trailers.insert(name, value);
        }
        self
    }

    /// Sets the outgoing wire variant explicitly.
    pub fn with_content_type(mut self, media_type: MediaType) -> Self {
        self.content_type = Some(media_type);
        self
    }

    /// Encodes into a transport response.
    ///
    /// `negotiated` is the variant the request negotiated; it supplies the
    /// outgoing `Content-Type` when neither the response's `content_type`
    /// nor an explicit header set one. Trailers are surfaced as plain
    /// headers (the mock transport answers over HTTP/1 as well as HTTP/2),
    /// and gRPC responses that set none get `grpc-status: 0`.
    pub fn into_http(
        self,
        negotiated: MediaType,
        codec: &dyn BodyCodec,
    ) -> Result<axum::response::Response, CodecError> {
        let body = codec.encode(&self.content)?;

        let mut response = axum::http::Response::builder().status(self.status);
        let outgoing = self.content_type.unwrap_or(negotiated);

        let headers = response.headers_mut().expect("fresh response builder");
        *headers = self.headers;
        if !headers.contains_key(axum::http::header::CONTENT_TYPE) {
            headers.insert(
                axum::http::header::CONTENT_TYPE,
                HeaderValue::from_static(outgoing.canonical()),
            );
        }
        let mut has_grpc_status = headers.contains_key("grpc-status");
        for (name, value) in self.trailers.iter() {
            has_grpc_status = has_grpc_status || name == "grpc-status";
            headers.insert(name.clone(), value.clone());
        }
        if outgoing.is_grpc() && !has_grpc_status {
            headers.insert("grpc-status", HeaderValue::from_static("0"));
        }

        response
            .body(axum::body::Body::from(body))
            .map_err(|_| CodecError::Unrepresentable {
                content: "body",
                content_type: outgoing.canonical(),
            })
    }
}

/// Per-request context handed to actions and dynamic response factories.
#[derive(Clone)]
pub struct Context {
    /// The routed endpoint.
    pub endpoint: Arc<Endpoint>,
    /// Point-in-time snapshot of the selected scenario.
    pub scenario: Arc<Scenario>,
    /// The session this request belongs to.
    pub session: SessionId,
    /// Span tagging log lines with endpoint, scenario, and session ids.
    pub span: tracing::Span,
}

impl Context {
    /// Builds a context, opening its tagged span.
    pub fn new(endpoint: Arc<Endpoint>, scenario: Arc<Scenario>, session: SessionId) -> Self {
        let span = tracing::debug_span!(
            "renkon_request",
            endpoint = %endpoint.id(),
            scenario = %scenario.id,
            session = %session,
        );
        Self {
            endpoint,
            scenario,
            session,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use serde_json::json;

    #[test]
    fn test_request_json_decoding() {
        let mut request = MockRequest::new(Method::POST, "/orders");
        request.content = Content::Json(json!({"count": 3}));

        #[derive(serde::Deserialize)]
        struct Order {
            count: u32,
        }
        let order: Order = request.json().unwrap();
        assert_eq!(order.count, 3);
    }

    #[test]
    fn test_content_type_defaults_to_the_negotiated_variant() {
        let response = MockResponse::json("ok", json!([1, 2]));
        let http = response.into_http(MediaType::Json, &JsonCodec).unwrap();
        assert_eq!(
            http.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_explicit_header_wins_over_defaults() {
        let response = MockResponse::new("ok").with_header("content-type", "text/json");
        let http = response.into_http(MediaType::Json, &JsonCodec).unwrap();
        assert_eq!(http.headers().get("content-type").unwrap(), "text/json");
    }

    #[test]
    fn test_grpc_gets_a_zero_status_trailer_by_default() {
        let response = MockResponse::new("ok");
        let http = response
            .into_http(MediaType::Grpc, &crate::codec::ProtobufCodec)
            .unwrap();
        assert_eq!(http.headers().get("grpc-status").unwrap(), "0");
    }

    #[test]
    fn test_explicit_trailers_are_kept() {
        let response = MockResponse::new("err").with_trailer("grpc-status", "13");
        let http = response
            .into_http(MediaType::Grpc, &crate::codec::ProtobufCodec)
            .unwrap();
        assert_eq!(http.headers().get("grpc-status").unwrap(), "13");
    }
}
