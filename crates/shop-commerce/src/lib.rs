//! Storefront core for the merch shop.
//!
//! This crate provides the catalog-to-cart path of the shop:
//!
//! - **Catalog**: Products, variants (bare labels or priced), variation
//!   schemas, bulk procurement rates
//! - **Variation**: Splitting variant labels into named tiers and back
//! - **Pricing**: Price, image and price-range resolution for a selection
//! - **Cart**: Cart snapshot with merge-on-add, buy-now orders, and a
//!   bridge that mirrors it to storage shared by every open tab
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shop_cache::{Broadcaster, Cache};
//! use shop_commerce::prelude::*;
//!
//! let catalog = Arc::new(Catalog::from_json(include_str!("products.json"))?);
//! let config = ShopConfig::load("shop.toml")?;
//!
//! let mut bridge = CartBridge::builder(Arc::clone(&catalog), config)
//!     .mount(Cache::in_memory(), Broadcaster::new())?;
//!
//! let tshirt = catalog.get(&ProductId::new("tshirt")).unwrap();
//! bridge.dispatch(&CartAction::add_item(tshirt, Some("White-S")));
//! println!("Total: {}", bridge.cart().total());
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod variation;

pub use config::{CartConfig, ShopConfig};
pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{CartConfig, ShopConfig};
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        BulkRate, Catalog, ImageSet, NormalizedVariant, Product, VariantInput, VariationSchema,
    };

    // Variation and pricing
    pub use crate::pricing::PriceRange;
    pub use crate::variation::VariationTiers;

    // Cart
    pub use crate::cart::{
        Cart, CartAction, CartBridge, LineItem, PersistedCart, MAX_QUANTITY_PER_ITEM,
    };
}
