//! Body codecs: the pluggable encode/decode seam.
//!
//! A [`BodyCodec`] turns wire bytes into [`Content`] and back. The built-in
//! JSON codec goes through `serde_json`; the built-in protobuf codec passes
//! raw body bytes through untouched (message-level protobuf handling is the
//! embedder's business, and the gRPC-web-text variant is not base64-decoded
//! here). Endpoints pick a codec by content-type tag and may override it.

use std::sync::Arc;

use bytes::Bytes;

use crate::content_type::ContentType;
use crate::error::CodecError;

/// Decoded request content or to-be-encoded response content.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// No body.
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// Opaque bytes (protobuf frames, or pre-encoded payloads).
    Bytes(Bytes),
}

impl Content {
    /// Whether there is no body.
    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Empty)
    }
}

/// Encode/decode interface between wire bytes and [`Content`].
pub trait BodyCodec: Send + Sync {
    /// Decodes a request body.
    fn decode(&self, body: Bytes) -> Result<Content, CodecError>;

    /// Encodes response content.
    fn encode(&self, content: &Content) -> Result<Bytes, CodecError>;
}

impl std::fmt::Debug for dyn BodyCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BodyCodec")
    }
}

/// `serde_json`-backed codec for JSON endpoints.
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn decode(&self, body: Bytes) -> Result<Content, CodecError> {
        if body.is_empty() {
            return Ok(Content::Empty);
        }
        let value = serde_json::from_slice(&body).map_err(|source| CodecError::InvalidBody {
            content_type: "application/json",
            source,
        })?;
        Ok(Content::Json(value))
    }

    fn encode(&self, content: &Content) -> Result<Bytes, CodecError> {
        match content {
            Content::Empty => Ok(Bytes::new()),
            Content::Json(value) => {
                let encoded =
                    serde_json::to_vec(value).map_err(|source| CodecError::InvalidBody {
                        content_type: "application/json",
                        source,
                    })?;
                Ok(Bytes::from(encoded))
            }
            // Pre-encoded payloads go out as-is.
            Content::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Pass-through codec for protobuf endpoints.
///
/// Consumes and emits raw body bytes; framing and message decoding stay
/// with the embedder.
pub struct ProtobufCodec;

impl BodyCodec for ProtobufCodec {
    fn decode(&self, body: Bytes) -> Result<Content, CodecError> {
        if body.is_empty() {
            Ok(Content::Empty)
        } else {
            Ok(Content::Bytes(body))
        }
    }

    fn encode(&self, content: &Content) -> Result<Bytes, CodecError> {
        match content {
            Content::Empty => Ok(Bytes::new()),
            Content::Bytes(bytes) => Ok(bytes.clone()),
            Content::Json(_) => Err(CodecError::Unrepresentable {
                content: "json",
                content_type: "application/grpc",
            }),
        }
    }
}

/// The built-in codec for a content-type tag.
pub fn default_codec(tag: ContentType) -> Arc<dyn BodyCodec> {
    match tag {
        ContentType::Json => Arc::new(JsonCodec),
        ContentType::Protobuf => Arc::new(ProtobufCodec),
    }
}
