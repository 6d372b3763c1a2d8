//! Content-type tagging and negotiation.
//!
//! Endpoints are tagged with a coarse [`ContentType`] (JSON or Protobuf);
//! negotiation resolves a request's `Content-Type` header against the tag's
//! supported set into the concrete [`MediaType`] variant, which in turn
//! names the canonical header value for the response.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::id::EndpointId;

/// Coarse content-type tag carried by an endpoint declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// `application/json` endpoints.
    Json,
    /// Protobuf endpoints, covering the gRPC, gRPC-web, and gRPC-web-text
    /// wire variants.
    Protobuf,
}

impl ContentType {
    /// The concrete variant used when a request carries no `Content-Type`.
    pub fn default_media_type(&self) -> MediaType {
        match self {
            ContentType::Json => MediaType::Json,
            ContentType::Protobuf => MediaType::Grpc,
        }
    }

    /// The outgoing variant for a response, given what the request
    /// negotiated.
    ///
    /// When the request's variant belongs to this tag the response echoes
    /// it (a gRPC-web call gets a gRPC-web response); otherwise the tag's
    /// default variant applies.
    pub fn default_media_type_for(&self, negotiated: MediaType) -> MediaType {
        if negotiated.tag() == *self {
            negotiated
        } else {
            self.default_media_type()
        }
    }

    /// Resolves a request's `Content-Type` header against this tag.
    ///
    /// An absent header negotiates to the default variant; a header outside
    /// the supported set is an unsupported-media-type failure.
    pub fn negotiate(
        &self,
        header: Option<&str>,
        endpoint: &EndpointId,
    ) -> Result<MediaType, RequestError> {
        let Some(header) = header else {
            return Ok(self.default_media_type());
        };
        // Parameters like "; charset=utf-8" do not participate.
        let essence = header.split(';').next().unwrap_or(header).trim();
        MediaType::from_header(essence)
            .filter(|media| media.tag() == *self)
            .ok_or_else(|| RequestError::UnsupportedMediaType {
                endpoint: endpoint.clone(),
                offered: header.to_string(),
            })
    }
}

/// A concrete negotiated wire variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// Canonical `application/json`, also accepting `text/json`.
    Json,
    /// Canonical `application/grpc`, also accepting `application/grpc+proto`.
    Grpc,
    /// Canonical `application/grpc-web+proto`, also accepting
    /// `application/grpc-web`.
    GrpcWeb,
    /// Canonical `application/grpc-web-text+proto`, also accepting
    /// `application/grpc-web-text`.
    GrpcWebText,
}

impl MediaType {
    /// The canonical header value for this variant.
    pub fn canonical(&self) -> &'static str {
        match self {
            MediaType::Json => "application/json",
            MediaType::Grpc => "application/grpc",
            MediaType::GrpcWeb => "application/grpc-web+proto",
            MediaType::GrpcWebText => "application/grpc-web-text+proto",
        }
    }

    /// The coarse tag this variant belongs to.
    pub fn tag(&self) -> ContentType {
        match self {
            MediaType::Json => ContentType::Json,
            MediaType::Grpc | MediaType::GrpcWeb | MediaType::GrpcWebText => ContentType::Protobuf,
        }
    }

    /// Whether this is one of the gRPC wire variants.
    pub fn is_grpc(&self) -> bool {
        self.tag() == ContentType::Protobuf
    }

    /// Parses a header value (without parameters) into a variant.
    pub fn from_header(essence: &str) -> Option<MediaType> {
        match essence.to_ascii_lowercase().as_str() {
            "application/json" | "text/json" => Some(MediaType::Json),
            "application/grpc" | "application/grpc+proto" => Some(MediaType::Grpc),
            "application/grpc-web+proto" | "application/grpc-web" => Some(MediaType::GrpcWeb),
            "application/grpc-web-text+proto" | "application/grpc-web-text" => {
                Some(MediaType::GrpcWebText)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointId {
        EndpointId::from("GET-/accounts")
    }

    #[test]
    fn test_canonical_table() {
        assert_eq!(MediaType::Json.canonical(), "application/json");
        assert_eq!(MediaType::Grpc.canonical(), "application/grpc");
        assert_eq!(MediaType::GrpcWeb.canonical(), "application/grpc-web+proto");
        assert_eq!(
            MediaType::GrpcWebText.canonical(),
            "application/grpc-web-text+proto"
        );
    }

    #[test]
    fn test_aliases_are_accepted() {
        assert_eq!(MediaType::from_header("text/json"), Some(MediaType::Json));
        assert_eq!(
            MediaType::from_header("application/grpc+proto"),
            Some(MediaType::Grpc)
        );
        assert_eq!(
            MediaType::from_header("application/grpc-web"),
            Some(MediaType::GrpcWeb)
        );
        assert_eq!(
            MediaType::from_header("application/grpc-web-text"),
            Some(MediaType::GrpcWebText)
        );
    }

    #[test]
    fn test_negotiation_ignores_parameters() {
        let media = ContentType::Json
            .negotiate(Some("application/json; charset=utf-8"), &endpoint())
            .unwrap();
        assert_eq!(media, MediaType::Json);
    }

    #[test]
    fn test_absent_header_uses_the_default_variant() {
        assert_eq!(
            ContentType::Json.negotiate(None, &endpoint()).unwrap(),
            MediaType::Json
        );
        assert_eq!(
            ContentType::Protobuf.negotiate(None, &endpoint()).unwrap(),
            MediaType::Grpc
        );
    }

    #[test]
    fn test_mismatched_header_is_unsupported() {
        let err = ContentType::Json
            .negotiate(Some("application/xml"), &endpoint())
            .unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedMediaType { .. }));

        // A grpc header on a JSON endpoint is outside the supported set too.
        let err = ContentType::Json
            .negotiate(Some("application/grpc"), &endpoint())
            .unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedMediaType { .. }));
    }
}
