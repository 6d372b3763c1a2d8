//! The `wait` built-in: sleep, then defer to the next action.

use async_trait::async_trait;

use crate::action::{Action, ActionConfiguration, ActionType};
use crate::delay::Delay;
use crate::error::ActionError;
use crate::id::ActionId;
use crate::message::{Context, MockRequest, MockResponse};

/// Action id of the built-in.
pub const WAIT: &str = "wait";

const SECONDS_KEY: &str = "duration.seconds";
const ATTOSECONDS_KEY: &str = "duration.attoseconds";

/// Sleeps the current task for the configured duration, then returns no
/// response so the pipeline advances.
///
/// Cancellation of the sleep is request cancellation: the task is simply
/// dropped at the suspension point.
pub struct Wait {
    duration: Delay,
}

impl Wait {
    /// Configures the action directly.
    pub fn new(duration: Delay) -> Self {
        Self { duration }
    }

    /// Constructs from a configuration dictionary.
    ///
    /// `duration.seconds` is required; `duration.attoseconds` defaults to
    /// zero.
    pub fn from_configuration(configuration: &ActionConfiguration) -> Result<Self, ActionError> {
        let seconds: i64 = configuration.require(SECONDS_KEY)?;
        let attoseconds: i64 = configuration.get_or(ATTOSECONDS_KEY, 0)?;
        Ok(Self::new(Delay::new(seconds, attoseconds)))
    }

    /// The configuration for a given duration.
    pub fn configuration(duration: Delay) -> ActionConfiguration {
        ActionConfiguration::new(WAIT)
            .with(SECONDS_KEY, duration.seconds)
            .with(ATTOSECONDS_KEY, duration.attoseconds)
    }
}

#[async_trait]
impl Action for Wait {
    fn make_configuration(&self) -> ActionConfiguration {
        Self::configuration(self.duration)
    }

    async fn perform(
        &self,
        _request: &MockRequest,
        context: &Context,
    ) -> Result<Option<MockResponse>, ActionError> {
        let duration = self.duration.to_std();
        tracing::debug!(parent: &context.span, ?duration, "waiting");
        tokio::time::sleep(duration).await;
        Ok(None)
    }
}

/// Table entry constructing [`Wait`].
pub struct WaitType;

impl ActionType for WaitType {
    fn id(&self) -> ActionId {
        ActionId::from(WAIT)
    }

    fn instantiate(
        &self,
        configuration: &ActionConfiguration,
    ) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(Wait::from_configuration(configuration)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_roundtrip_is_idempotent() {
        let config = Wait::configuration(Delay::new(2, 500_000_000_000_000_000));
        let action = Wait::from_configuration(&config).unwrap();
        assert_eq!(action.make_configuration(), config);
    }

    #[test]
    fn test_attoseconds_default_to_zero() {
        let config = ActionConfiguration::new(WAIT).with(SECONDS_KEY, 1i64);
        let action = Wait::from_configuration(&config).unwrap();
        assert_eq!(action.duration, Delay::from_secs(1));
        // A second roundtrip is stable even though the first normalized
        // the absent attoseconds key.
        let normalized = action.make_configuration();
        let again = Wait::from_configuration(&normalized).unwrap();
        assert_eq!(again.make_configuration(), normalized);
    }

    #[test]
    fn test_missing_seconds_key() {
        let err = Wait::from_configuration(&ActionConfiguration::new(WAIT)).unwrap_err();
        assert!(matches!(err, ActionError::PropertyMissing { .. }));
    }
}
