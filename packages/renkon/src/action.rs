//! Actions: the unit of pipeline work.
//!
//! An [`Action`] is a configured behavior executed inside a pipeline step.
//! Its `perform` contract has three outcomes: a response (the pipeline
//! terminates and the server encodes it), an error (the pipeline terminates
//! and the error propagates), or `None` (the pipeline advances to the next
//! action within the same request).
//!
//! Actions are described on the wire by an [`ActionConfiguration`] — a
//! serializable, structurally comparable dictionary of boxed values — and
//! constructed from one by an [`ActionType`] registered in the
//! [`ActionTypeTable`]. The type-erasure mirrors how a runtime holds many
//! machine types in one collection: the table stores `Arc<dyn ActionType>`
//! keyed by action id.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, PipelineError, RegistrationError};
use crate::id::ActionId;
use crate::message::{Context, MockRequest, MockResponse};
use crate::value::{Boxable, BoxedValue};

/// A serializable, structurally comparable description of one action step.
///
/// Equality is structural over the id and every configured value; the
/// pipeline compatibility check relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfiguration {
    /// The action type to construct.
    pub id: ActionId,
    /// Keyed boxed values consumed by the action's constructor.
    #[serde(default)]
    pub configuration: BTreeMap<String, BoxedValue>,
}

impl ActionConfiguration {
    /// An empty configuration for the given action type.
    pub fn new(id: impl Into<ActionId>) -> Self {
        Self {
            id: id.into(),
            configuration: BTreeMap::new(),
        }
    }

    /// Sets a key to a boxed value.
    pub fn with(mut self, key: impl Into<String>, value: impl Boxable) -> Self {
        self.configuration.insert(key.into(), value.to_boxed());
        self
    }

    /// Looks a raw boxed value up.
    pub fn get(&self, key: &str) -> Option<&BoxedValue> {
        self.configuration.get(key)
    }

    /// Unboxes a required key.
    ///
    /// An absent key is a configuration-property-missing failure; a present
    /// key that cannot unbox is a configuration-type-mismatch failure.
    pub fn require<T: Boxable>(&self, key: &str) -> Result<T, ActionError> {
        match self.configuration.get(key) {
            None => Err(ActionError::PropertyMissing {
                key: key.to_string(),
            }),
            Some(value) => T::from_boxed(Some(value)).ok_or_else(|| ActionError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// Unboxes an optional key; absence yields the fallback.
    pub fn get_or<T: Boxable>(&self, key: &str, fallback: T) -> Result<T, ActionError> {
        match self.configuration.get(key) {
            None => Ok(fallback),
            Some(value) => T::from_boxed(Some(value)).ok_or_else(|| ActionError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            }),
        }
    }
}

/// A configured behavior executed inside a pipeline step.
#[async_trait]
pub trait Action: Send + Sync {
    /// The configuration this instance was built from.
    ///
    /// Constructing an action from a configuration and reading it back must
    /// be idempotent: `A(c).make_configuration() == c` for every
    /// configuration `c` the action itself produced.
    fn make_configuration(&self) -> ActionConfiguration;

    /// Executes one pipeline step.
    ///
    /// `Ok(Some(response))` terminates the pipeline with that response,
    /// `Err` terminates it with the error, `Ok(None)` defers to the next
    /// action in the same request.
    async fn perform(
        &self,
        request: &MockRequest,
        context: &Context,
    ) -> Result<Option<MockResponse>, ActionError>;
}

/// Factory for one action id, registered in the [`ActionTypeTable`].
pub trait ActionType: Send + Sync {
    /// The action id this type constructs.
    fn id(&self) -> ActionId;

    /// Builds an action instance from its configuration.
    fn instantiate(&self, configuration: &ActionConfiguration)
        -> Result<Box<dyn Action>, ActionError>;
}

/// The action-type table: `ActionId` to constructor.
///
/// Frozen for the server's running lifetime alongside the endpoint
/// registry.
#[derive(Default)]
pub struct ActionTypeTable {
    types: HashMap<ActionId, Arc<dyn ActionType>>,
}

impl ActionTypeTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pre-loaded with the built-in action types.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table
            .insert(Arc::new(crate::actions::ReturnResponseType))
            .expect("empty table accepts the builtins");
        table
            .insert(Arc::new(crate::actions::WaitType))
            .expect("empty table accepts the builtins");
        table
    }

    /// Registers an action type, enforcing id uniqueness.
    pub fn insert(&mut self, action_type: Arc<dyn ActionType>) -> Result<(), RegistrationError> {
        let id = action_type.id();
        if self.types.contains_key(&id) {
            return Err(RegistrationError::DuplicateAction(id));
        }
        self.types.insert(id, action_type);
        Ok(())
    }

    /// Looks a type up by id.
    pub fn get(&self, id: &ActionId) -> Option<&Arc<dyn ActionType>> {
        self.types.get(id)
    }

    /// Constructs an action instance from a configuration.
    ///
    /// An id absent from the table is an unknown-action-type failure.
    pub fn instantiate(
        &self,
        configuration: &ActionConfiguration,
    ) -> Result<Box<dyn Action>, PipelineError> {
        let action_type = self
            .types
            .get(&configuration.id)
            .ok_or_else(|| PipelineError::UnknownActionType(configuration.id.clone()))?;
        action_type
            .instantiate(configuration)
            .map_err(PipelineError::Action)
    }

    /// The registered action ids.
    pub fn ids(&self) -> impl Iterator<Item = &ActionId> {
        self.types.keys()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Accumulating builder for action-type registrations.
pub type ActionsBuilder = crate::builder::ListBuilder<Arc<dyn ActionType>>;
