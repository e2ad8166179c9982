//! Session correlation
//!
//! Every side pair carries a `SessionId` so that log events emitted while
//! loading and classifying rows can be grouped per diff session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one diff session (one linked pair of sides)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new time-ordered SessionId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_session_ids_are_time_ordered() {
        let first = SessionId::new();
        let second = SessionId::new();

        // UUIDv7 strings sort by creation time
        assert!(first.as_str() < second.as_str());
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::from_string("session-1".to_string());
        assert_eq!(format!("{}", id), "session-1");
    }

    #[test]
    fn test_serialization() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
