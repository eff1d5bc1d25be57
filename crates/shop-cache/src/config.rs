//! Persistence configuration.

use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Settings for the persisted cart envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Prefix for every storage key.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Logical key of the cart.
    #[serde(default = "default_cart_key")]
    pub cart_key: String,

    /// Envelope schema version. Bump to trigger migration.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Days before a stored cart expires. `0` disables expiry.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,

    /// Largest serialized envelope that will be written. `0` disables the cap.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            cart_key: default_cart_key(),
            version: default_version(),
            ttl_days: default_ttl_days(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl PersistConfig {
    /// Expiry window in milliseconds, if any.
    pub fn ttl_millis(&self) -> Option<i64> {
        (self.ttl_days > 0).then(|| i64::from(self.ttl_days) * MILLIS_PER_DAY)
    }

    /// Size cap in bytes, if any.
    pub fn max_bytes(&self) -> Option<usize> {
        (self.max_bytes > 0).then_some(self.max_bytes)
    }

    /// Options for the envelope stored under `key`.
    pub fn options_for(&self, key: impl Into<String>) -> PersistOptions {
        PersistOptions {
            namespace: self.namespace.clone(),
            key: key.into(),
            version: self.version,
            ttl_millis: self.ttl_millis(),
            max_bytes: self.max_bytes(),
        }
    }

    /// Options for the cart envelope.
    pub fn cart_options(&self) -> PersistOptions {
        self.options_for(self.cart_key.clone())
    }
}

fn default_namespace() -> String {
    "shop".to_string()
}

fn default_cart_key() -> String {
    "cart".to_string()
}

fn default_version() -> u32 {
    1
}

fn default_ttl_days() -> u32 {
    90
}

fn default_max_bytes() -> usize {
    200_000
}

/// Resolved options for one persisted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    pub namespace: String,
    pub key: String,
    pub version: u32,
    pub ttl_millis: Option<i64>,
    pub max_bytes: Option<usize>,
}

impl PersistOptions {
    /// Options with no expiry and no size cap.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, version: u32) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            version,
            ttl_millis: None,
            max_bytes: None,
        }
    }

    pub fn with_ttl_millis(mut self, ttl_millis: i64) -> Self {
        self.ttl_millis = Some(ttl_millis);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// The namespaced storage key, e.g. `shop:persist:cart`.
    pub fn storage_key(&self) -> String {
        crate::cache_key!(self.namespace.as_str(), "persist", self.key)
    }
}
