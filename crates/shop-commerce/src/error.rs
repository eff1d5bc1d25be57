//! Commerce error types.
//!
//! Only construction-time operations fail: loading the catalog and the
//! configuration. Cart and pricing operations degrade to safe defaults
//! instead of returning errors.

use thiserror::Error;

use crate::money::Currency;

/// Errors that can occur while loading shop data.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product with an empty id.
    #[error("Product has an empty id")]
    EmptyProductId,

    /// Two products share one id.
    #[error("Duplicate product id: {0}")]
    DuplicateProduct(String),

    /// Two variants of one product share a label.
    #[error("Duplicate variation label {label:?} on product {product_id}")]
    DuplicateVariant { product_id: String, label: String },

    /// Bulk rate tier with zero units.
    #[error("Bulk rate on product {0} has zero units")]
    InvalidBulkRate(String),

    /// Prices in a currency other than the one expected.
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for CommerceError {
    fn from(e: toml::de::Error) -> Self {
        CommerceError::ConfigError(e.to_string())
    }
}
