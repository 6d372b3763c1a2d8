//! The `return-response` built-in: resolve a canned response by id.

use async_trait::async_trait;

use crate::action::{Action, ActionConfiguration, ActionType};
use crate::error::ActionError;
use crate::id::{ActionId, ResponseId};
use crate::message::{Context, MockRequest, MockResponse};

/// Action id of the built-in.
pub const RETURN_RESPONSE: &str = "return-response";

const RESPONSE_ID_KEY: &str = "response-id";

/// Resolves `response-id` in the endpoint's response table and returns the
/// produced response, terminating the pipeline.
///
/// A missing id is a fatal pipeline error.
pub struct ReturnResponse {
    response_id: ResponseId,
}

impl ReturnResponse {
    /// Configures the action directly.
    pub fn new(response_id: impl Into<ResponseId>) -> Self {
        Self {
            response_id: response_id.into(),
        }
    }

    /// Constructs from a configuration dictionary.
    pub fn from_configuration(configuration: &ActionConfiguration) -> Result<Self, ActionError> {
        let response_id: String = configuration.require(RESPONSE_ID_KEY)?;
        Ok(Self::new(response_id))
    }

    /// The configuration for a given response id.
    pub fn configuration(response_id: impl Into<ResponseId>) -> ActionConfiguration {
        ActionConfiguration::new(RETURN_RESPONSE)
            .with(RESPONSE_ID_KEY, response_id.into().into_string())
    }
}

#[async_trait]
impl Action for ReturnResponse {
    fn make_configuration(&self) -> ActionConfiguration {
        Self::configuration(self.response_id.clone())
    }

    async fn perform(
        &self,
        request: &MockRequest,
        context: &Context,
    ) -> Result<Option<MockResponse>, ActionError> {
        let factory = context.endpoint.response(&self.response_id).ok_or_else(|| {
            ActionError::ResponseNotFound {
                response: self.response_id.clone(),
                endpoint: context.endpoint.id().clone(),
            }
        })?;
        tracing::debug!(parent: &context.span, response = %self.response_id, "returning canned response");
        factory.produce(request, context).map(Some)
    }
}

/// Table entry constructing [`ReturnResponse`].
pub struct ReturnResponseType;

impl ActionType for ReturnResponseType {
    fn id(&self) -> ActionId {
        ActionId::from(RETURN_RESPONSE)
    }

    fn instantiate(
        &self,
        configuration: &ActionConfiguration,
    ) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(ReturnResponse::from_configuration(configuration)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionError;

    #[test]
    fn test_configuration_roundtrip_is_idempotent() {
        let config = ReturnResponse::configuration("zero-balance");
        let action = ReturnResponse::from_configuration(&config).unwrap();
        assert_eq!(action.make_configuration(), config);
    }

    #[test]
    fn test_missing_response_id_key() {
        let err = ReturnResponse::from_configuration(&ActionConfiguration::new(RETURN_RESPONSE))
            .unwrap_err();
        assert!(matches!(err, ActionError::PropertyMissing { .. }));
    }
}
