//! Identity of one execution context (one open tab) sharing a store.

use serde::{Deserialize, Serialize};

/// Identifier for a writer of the shared store.
///
/// Broadcasts carry the origin that produced them so listeners can tell a
/// change made by their own tab from a change made by another tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginId(String);

impl OriginId {
    /// Create an origin ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random origin ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 12] = rand::thread_rng().gen();
        Self(format!("tab_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the origin ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OriginId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OriginId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
