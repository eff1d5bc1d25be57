//! Durable cart shape and its mapping to and from [`Cart`].
//!
//! The stored cart carries only what is needed to rebuild lines:
//! `{ items: [{ id, sku?, qty, price?, name?, image?, category? }],
//!    coupons, updatedAt, currency? }`.
//! Anything read back is sanitized first; bad items and fields are dropped
//! rather than failing the whole cart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shop_cache::{Broadcaster, Cache, Clock, OriginId, PersistedState};
use tracing::{debug, warn};

use crate::cart::{clamp_quantity, Cart, LineItem};
use crate::catalog::{Catalog, Product};
use crate::config::{CartConfig, ShopConfig};
use crate::ids::ProductId;
use crate::money::{Currency, Money};

/// One stored cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLineItem {
    /// Product id.
    pub id: String,
    /// Selected variation label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub qty: u32,
    /// Unit price when the line was added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl PersistedLineItem {
    pub fn from_line(item: &LineItem) -> Self {
        Self {
            id: item.product_id.to_string(),
            sku: item.selected_variation.clone(),
            qty: item.quantity,
            price: Some(item.unit_price.to_decimal()),
            name: Some(item.name.clone()),
            image: Some(item.image.clone()).filter(|image| !image.is_empty()),
            category: Some(item.category.clone()).filter(|category| !category.is_empty()),
        }
    }
}

/// The stored cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCart {
    pub items: Vec<PersistedLineItem>,
    #[serde(default)]
    pub coupons: Vec<String>,
    /// Last change, Unix milliseconds.
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl PersistedCart {
    pub fn empty(now: i64) -> Self {
        Self {
            items: Vec::new(),
            coupons: Vec::new(),
            updated_at: now,
            currency: None,
        }
    }

    /// Snapshot a cart's items and the entered coupons.
    pub fn from_cart(cart: &Cart, coupons: &[String], now: i64) -> Self {
        Self {
            items: cart.items().iter().map(PersistedLineItem::from_line).collect(),
            coupons: coupons.to_vec(),
            updated_at: now,
            currency: Some(cart.currency().code().to_string()),
        }
    }

    /// Whether stored prices are in `currency`. Carts written without a
    /// currency are taken to be in it.
    pub fn is_priced_in(&self, currency: Currency) -> bool {
        match &self.currency {
            Some(code) => Currency::from_code(code) == Some(currency),
            None => true,
        }
    }

    /// Rebuild a regular cart against the catalog, in the catalog's
    /// currency.
    ///
    /// Products missing from the catalog are replaced by a stand-in built
    /// from the stored fields. A stored price wins over the catalog's
    /// current price unless it was stored in another currency. Lines that
    /// end up sharing a key are merged.
    pub fn hydrate(&self, catalog: &Catalog) -> Cart {
        let currency = catalog.currency();
        let use_stored_prices = self.is_priced_in(currency);
        if !use_stored_prices {
            debug!(
                stored = ?self.currency,
                catalog = %currency,
                "stored cart in another currency, repricing from catalog"
            );
        }

        let lines = self
            .items
            .iter()
            .map(|stored| {
                let product_id = ProductId::new(stored.id.clone());
                let stored_price = stored
                    .price
                    .filter(|_| use_stored_prices)
                    .and_then(|price| Money::try_from_decimal(price, currency));

                let stand_in;
                let product: &Product = match catalog.get(&product_id) {
                    Some(product) => product,
                    None => {
                        warn!(product_id = %product_id, "cart item not in catalog, using stand-in");
                        stand_in = Product::stand_in(
                            product_id,
                            stored.name.clone(),
                            stored_price.unwrap_or_else(|| Money::zero(currency)),
                            stored.image.clone(),
                            stored.category.clone(),
                        );
                        &stand_in
                    }
                };

                let mut line = LineItem::from_product(product, stored.sku.as_deref(), stored.qty);
                if let Some(price) = stored_price {
                    line.unit_price = price;
                }
                line
            })
            .collect();

        let mut cart = Cart::from_items(lines, currency);
        cart.squash_duplicates();
        cart
    }
}

/// Sanitize untrusted stored data into a [`PersistedCart`].
///
/// Items need a string `id` and a numeric `qty`; `qty` is floored and
/// clamped to at least 1. Non-numeric prices and non-string fields are
/// dropped. Only string coupons are kept, up to `max_coupons`, and only the
/// last `max_items` items. Returns `None` when `value` is not an object.
pub fn sanitize_cart(value: Value, config: &CartConfig, now: i64) -> Option<PersistedCart> {
    let Value::Object(object) = value else {
        return None;
    };

    let mut items: Vec<PersistedLineItem> = object
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(sanitize_item).collect())
        .unwrap_or_default();
    if items.len() > config.max_items {
        let excess = items.len() - config.max_items;
        items.drain(..excess);
    }

    let coupons: Vec<String> = object
        .get("coupons")
        .and_then(Value::as_array)
        .map(|coupons| {
            coupons
                .iter()
                .filter_map(Value::as_str)
                .take(config.max_coupons)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(PersistedCart {
        items,
        coupons,
        updated_at: now,
        currency: string_field(&object, "currency"),
    })
}

fn sanitize_item(item: &Value) -> Option<PersistedLineItem> {
    let object = item.as_object()?;
    let id = object.get("id")?.as_str()?.to_string();
    let qty = object.get("qty")?.as_f64().filter(|q| q.is_finite())?;

    Some(PersistedLineItem {
        id,
        sku: string_field(object, "sku"),
        qty: clamp_quantity(qty.floor() as i64),
        price: object
            .get("price")
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite()),
        name: string_field(object, "name"),
        image: string_field(object, "image"),
        category: string_field(object, "category"),
    })
}

fn string_field(object: &serde_json::Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Build the persisted cart value described by `config`.
///
/// Stored data is sanitized on every read, and data from an older envelope
/// version goes through the same sanitizer since the shape has not changed.
pub fn cart_store(
    config: &ShopConfig,
    cache: Cache,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    origin: Option<OriginId>,
) -> PersistedState<PersistedCart> {
    let initial_clock = Arc::clone(&clock);
    let validate_clock = Arc::clone(&clock);
    let migrate_clock = Arc::clone(&clock);
    let validate_config = config.cart.clone();
    let migrate_config = config.cart.clone();

    let mut builder = PersistedState::builder(config.persist.cart_options(), move || {
        PersistedCart::empty(initial_clock.now_millis())
    })
    .validate(move |value| sanitize_cart(value, &validate_config, validate_clock.now_millis()))
    .migrate(move |value, from| {
        debug!(from, "migrating stored cart");
        sanitize_cart(value, &migrate_config, migrate_clock.now_millis())
    })
    .on_quota_eviction(|eviction| {
        warn!(key = %eviction.key, bytes = eviction.attempted_bytes, "cart too large to store");
    })
    .clock(clock);

    if let Some(origin) = origin {
        builder = builder.origin(origin);
    }
    builder.build(cache, broadcaster)
}
