//! Typed string identifiers for compile-time namespace safety.
//!
//! This module provides `Id<T>`, a typed wrapper around an identifier string
//! that prevents accidentally mixing up identifiers from different namespaces
//! (e.g., passing a `ScenarioId` where an `EndpointId` was expected).
//!
//! Two identifiers are equal iff they carry the same namespace marker type
//! and the same string.
//!
//! # Example
//!
//! ```rust
//! use renkon::id::{EndpointId, ScenarioId};
//!
//! let endpoint = EndpointId::from("GET-/accounts");
//! let scenario = ScenarioId::from("flat-broke");
//!
//! // This would be a compile error:
//! // let wrong: EndpointId = scenario;
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use uuid::Uuid;

/// Namespace marker types for [`Id`].
pub mod marker {
    /// Namespace for action type identifiers.
    pub struct Action;
    /// Namespace for endpoint identifiers.
    pub struct Endpoint;
    /// Namespace for response identifiers.
    pub struct Response;
    /// Namespace for scenario identifiers.
    pub struct Scenario;
    /// Namespace for session identifiers.
    pub struct Session;
}

/// Identifies a registered action type.
pub type ActionId = Id<marker::Action>;
/// Identifies a registered endpoint.
pub type EndpointId = Id<marker::Endpoint>;
/// Identifies a canned response within an endpoint's response table.
pub type ResponseId = Id<marker::Response>;
/// Identifies a scenario.
pub type ScenarioId = Id<marker::Scenario>;
/// Identifies a client session. See [`SessionId::mint`].
pub type SessionId = Id<marker::Session>;

/// A namespaced identifier string.
///
/// The type parameter `T` is a zero-sized namespace marker; identifiers with
/// different markers are incompatible at compile time.
#[repr(transparent)]
pub struct Id<T>(String, PhantomData<fn() -> T>);

impl<T> Id<T> {
    /// Creates an identifier from a raw string.
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into(), PhantomData)
    }

    /// Returns the identifier string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier and returns the inner string.
    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl SessionId {
    /// Mints a fresh session identifier from a random UUIDv4.
    ///
    /// Used when a request carries no `x-renkon-session` header.
    pub fn mint() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

// ============================================================================
// Standard trait implementations
// ============================================================================
//
// Implemented by hand rather than derived so the bounds do not leak onto the
// (uninhabited) marker type.

impl<T> Clone for Id<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone(), PhantomData)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Id<{}>", std::any::type_name::<T>()))
            .field(&self.0)
            .finish()
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for Id<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> Hash for Id<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> From<&str> for Id<T> {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T> From<String> for Id<T> {
    #[inline]
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T> AsRef<str> for Id<T> {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Serde support
// ============================================================================

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_per_string() {
        assert_eq!(EndpointId::from("GET-/accounts"), EndpointId::from("GET-/accounts"));
        assert_ne!(EndpointId::from("GET-/accounts"), EndpointId::from("POST-/accounts"));
    }

    #[test]
    fn test_serde_roundtrip_as_plain_string() {
        let id = ScenarioId::from("flat-broke");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"flat-broke\"");
        let parsed: ScenarioId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_minted_sessions_are_unique() {
        assert_ne!(SessionId::mint(), SessionId::mint());
    }

    #[test]
    fn test_map_key() {
        use std::collections::HashMap;
        let mut map: HashMap<SessionId, u32> = HashMap::new();
        let id = SessionId::from("client-1");
        map.insert(id.clone(), 7);
        assert_eq!(map.get(&id), Some(&7));
    }

    #[test]
    fn test_debug_includes_namespace() {
        let id = ActionId::from("wait");
        assert!(format!("{:?}", id).contains("Action"));
    }
}
