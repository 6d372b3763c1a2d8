//! Scenarios and the hot-swappable scenario registry.
//!
//! A scenario maps each endpoint id to an ordered action configuration
//! list, plus scalar options. Unlike endpoints and action types, scenarios
//! may be added, removed, or set as default at any time — including while
//! the server is running. Readers receive `Arc` snapshots so a request
//! observes one consistent scenario for its whole lifetime.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::action::ActionConfiguration;
use crate::builder::ListBuilder;
use crate::delay::Delay;
use crate::error::ScenarioSelectionError;
use crate::id::{EndpointId, ScenarioId};
use crate::value::BoxedValue;

/// Recognized scenario-wide options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioOptions {
    /// Wall-clock cap on long-lived streaming responses. Defaults to the
    /// maximum representable delay, i.e. effectively unbounded.
    pub maximum_stream_lifetime: Delay,
    /// Optional delay applied once per request before pipeline entry.
    pub delay_all_requests: Option<Delay>,
    /// User-extensible options, opaque to the engine.
    pub custom_options: BTreeMap<String, BoxedValue>,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self {
            maximum_stream_lifetime: Delay::MAX,
            delay_all_requests: None,
            custom_options: BTreeMap::new(),
        }
    }
}

/// A named configuration mapping endpoints to ordered action lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Globally unique scenario id.
    pub id: ScenarioId,
    /// Human-facing name.
    #[serde(default)]
    pub display_name: String,
    /// Human-facing description.
    #[serde(default)]
    pub description: String,
    /// Scenario-wide options.
    #[serde(default)]
    pub options: ScenarioOptions,
    /// Ordered action configurations per endpoint.
    #[serde(default)]
    pub endpoints: BTreeMap<EndpointId, Vec<ActionConfiguration>>,
}

impl Scenario {
    /// An empty scenario.
    pub fn new(id: impl Into<ScenarioId>) -> Self {
        let id = id.into();
        Self {
            display_name: id.as_str().to_string(),
            id,
            description: String::new(),
            options: ScenarioOptions::default(),
            endpoints: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: ScenarioOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the action list for an endpoint.
    pub fn with_actions(
        mut self,
        endpoint: impl Into<EndpointId>,
        actions: Vec<ActionConfiguration>,
    ) -> Self {
        self.endpoints.insert(endpoint.into(), actions);
        self
    }

    /// The action list configured for an endpoint, if any.
    pub fn actions_for(&self, endpoint: &EndpointId) -> Option<&[ActionConfiguration]> {
        self.endpoints.get(endpoint).map(Vec::as_slice)
    }
}

#[derive(Default)]
struct ScenarioStore {
    scenarios: std::collections::HashMap<ScenarioId, Arc<Scenario>>,
    default: Option<ScenarioId>,
}

/// Thread-safe, clonable scenario registry.
///
/// A single exclusion domain guards the store; readers take point-in-time
/// `Arc<Scenario>` snapshots.
#[derive(Clone, Default)]
pub struct ScenarioRegistry {
    inner: Arc<RwLock<ScenarioStore>>,
}

impl ScenarioRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scenario, replacing any scenario with the same id.
    ///
    /// Replacing is the hot-reconfiguration path: pipelines built from the
    /// old action lists are rebuilt lazily on their next request.
    pub async fn add(&self, scenario: Scenario) {
        let mut store = self.inner.write().await;
        tracing::debug!(scenario = %scenario.id, "registering scenario");
        store
            .scenarios
            .insert(scenario.id.clone(), Arc::new(scenario));
    }

    /// Removes a scenario. Clears the default if it named this scenario.
    pub async fn remove(&self, id: &ScenarioId) -> Option<Arc<Scenario>> {
        let mut store = self.inner.write().await;
        if store.default.as_ref() == Some(id) {
            store.default = None;
        }
        store.scenarios.remove(id)
    }

    /// Adds a scenario and marks it as the default for requests that carry
    /// no scenario header.
    pub async fn set_default(&self, scenario: Scenario) {
        let mut store = self.inner.write().await;
        store.default = Some(scenario.id.clone());
        store
            .scenarios
            .insert(scenario.id.clone(), Arc::new(scenario));
    }

    /// Looks a scenario up by id.
    pub async fn get(&self, id: &ScenarioId) -> Option<Arc<Scenario>> {
        self.inner.read().await.scenarios.get(id).cloned()
    }

    /// The default scenario, if one is configured.
    pub async fn default_scenario(&self) -> Option<Arc<Scenario>> {
        let store = self.inner.read().await;
        let id = store.default.as_ref()?;
        store.scenarios.get(id).cloned()
    }

    /// Snapshot of all registered scenarios.
    pub async fn list(&self) -> Vec<Arc<Scenario>> {
        self.inner.read().await.scenarios.values().cloned().collect()
    }

    /// Resolves the scenario for a request from its header value.
    ///
    /// A present header must name a registered scenario; an absent header
    /// falls back to the default. Both failure modes surface as 403.
    pub async fn resolve(
        &self,
        header: Option<&str>,
    ) -> Result<Arc<Scenario>, ScenarioSelectionError> {
        let store = self.inner.read().await;
        match header {
            Some(name) => store
                .scenarios
                .get(&ScenarioId::from(name))
                .cloned()
                .ok_or_else(|| ScenarioSelectionError::Unknown(name.to_string())),
            None => {
                let id = store
                    .default
                    .as_ref()
                    .ok_or(ScenarioSelectionError::HeaderMissing)?;
                store
                    .scenarios
                    .get(id)
                    .cloned()
                    .ok_or(ScenarioSelectionError::HeaderMissing)
            }
        }
    }
}

/// Accumulating builder for scenario registrations.
pub type ScenariosBuilder = ListBuilder<Scenario>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ReturnResponse, Wait};

    fn sample() -> Scenario {
        Scenario::new("flat-broke")
            .with_display_name("Flat broke")
            .with_description("Every account is empty")
            .with_actions(
                "GET-/accounts",
                vec![
                    Wait::configuration(Delay::from_secs(1)),
                    ReturnResponse::configuration("zero-balance"),
                ],
            )
    }

    #[test]
    fn test_json_roundtrip() {
        let scenario = sample();
        let json = serde_json::to_string(&scenario).unwrap();
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(scenario, back);
    }

    #[test]
    fn test_options_default_shape() {
        let options: ScenarioOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.maximum_stream_lifetime, Delay::MAX);
        assert_eq!(options.delay_all_requests, None);
        assert!(options.custom_options.is_empty());
    }

    #[tokio::test]
    async fn test_resolution() {
        let registry = ScenarioRegistry::new();
        registry.add(sample()).await;

        let resolved = registry.resolve(Some("flat-broke")).await.unwrap();
        assert_eq!(resolved.id, ScenarioId::from("flat-broke"));

        let err = registry.resolve(Some("ghost")).await.unwrap_err();
        assert!(matches!(err, ScenarioSelectionError::Unknown(_)));

        let err = registry.resolve(None).await.unwrap_err();
        assert!(matches!(err, ScenarioSelectionError::HeaderMissing));

        registry.set_default(sample()).await;
        assert!(registry.resolve(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_clears_the_default() {
        let registry = ScenarioRegistry::new();
        registry.set_default(sample()).await;
        registry.remove(&ScenarioId::from("flat-broke")).await;
        assert!(registry.resolve(None).await.is_err());
    }

    #[tokio::test]
    async fn test_add_replaces_in_place() {
        let registry = ScenarioRegistry::new();
        registry.add(sample()).await;
        registry
            .add(Scenario::new("flat-broke").with_actions("GET-/accounts", vec![]))
            .await;
        let resolved = registry.resolve(Some("flat-broke")).await.unwrap();
        assert_eq!(
            resolved.actions_for(&EndpointId::from("GET-/accounts")),
            Some(&[][..])
        );
    }
}
