//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a ProductId where a LineKey is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(LineKey);

/// Variation segment used when no variation is selected.
pub const DEFAULT_VARIATION_KEY: &str = "default";

impl LineKey {
    /// Deterministic key for a product and selected variation:
    /// `"{product_id}::{variation}"`, with the variation trimmed and
    /// lower-cased, or `default` when none is selected.
    pub fn for_item(product_id: &ProductId, selected_variation: Option<&str>) -> Self {
        Self(format!(
            "{}::{}",
            product_id,
            normalize_variation(selected_variation)
        ))
    }
}

/// Trim and lower-case a variation label for keying; blank means `default`.
pub fn normalize_variation(selected_variation: Option<&str>) -> String {
    match selected_variation.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_lowercase(),
        _ => DEFAULT_VARIATION_KEY.to_string(),
    }
}
