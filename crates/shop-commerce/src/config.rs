//! Shop configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use shop_cache::PersistConfig;

use crate::error::CommerceError;
use crate::money::Currency;

/// Shop configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Cart envelope settings.
    #[serde(default)]
    pub persist: PersistConfig,

    /// Cart limits and currency.
    #[serde(default)]
    pub cart: CartConfig,
}

impl ShopConfig {
    /// Load config from a `.json` or TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CommerceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommerceError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| {
                CommerceError::ConfigError(format!(
                    "Failed to parse JSON config {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML config from a string.
    pub fn from_toml_str(content: &str) -> Result<Self, CommerceError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, CommerceError> {
        toml::to_string_pretty(self).map_err(|e| CommerceError::ConfigError(e.to_string()))
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<(), CommerceError> {
        self.cart.currency()?;
        if self.persist.namespace.trim().is_empty() {
            return Err(CommerceError::ConfigError(
                "persist.namespace must not be empty".to_string(),
            ));
        }
        if self.persist.cart_key.trim().is_empty() {
            return Err(CommerceError::ConfigError(
                "persist.cart_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cart configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Currency code of the shop (default: BDT).
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Most lines kept when a stored cart is read back.
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Most coupon codes kept in the cart.
    #[serde(default = "default_max_coupons")]
    pub max_coupons: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            max_items: default_max_items(),
            max_coupons: default_max_coupons(),
        }
    }
}

impl CartConfig {
    /// The configured currency.
    pub fn currency(&self) -> Result<Currency, CommerceError> {
        Currency::from_code(&self.currency).ok_or_else(|| {
            CommerceError::ConfigError(format!("Unsupported currency: {}", self.currency))
        })
    }
}

fn default_currency() -> String {
    Currency::default().code().to_string()
}

fn default_max_items() -> usize {
    500
}

fn default_max_coupons() -> usize {
    50
}
