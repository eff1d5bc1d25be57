//! Keeps a tab's [`Cart`] in step with the shared stored cart.
//!
//! Every local change is written back as one whole-cart replace. Changes
//! written by other tabs are queued as they are announced and applied by
//! [`CartBridge::apply_remote_changes`], which also runs before every local
//! change. Across tabs the latest write wins.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use shop_cache::{
    Broadcaster, Cache, Change, Clock, OriginId, PersistedState, Subscription, SystemClock,
};
use tracing::{debug, warn};

use crate::cart::{cart_store, Cart, CartAction, PersistedCart};
use crate::catalog::Catalog;
use crate::config::{CartConfig, ShopConfig};
use crate::error::CommerceError;
use crate::money::Currency;

type Inbox = Arc<Mutex<VecDeque<Change<PersistedCart>>>>;

/// Builder for [`CartBridge`].
pub struct CartBridgeBuilder {
    catalog: Arc<Catalog>,
    config: ShopConfig,
    clock: Arc<dyn Clock>,
    origin: Option<OriginId>,
}

impl CartBridgeBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Identify this tab. A random origin is generated otherwise.
    pub fn origin(mut self, origin: OriginId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Read the stored cart, hydrate from it and start listening for
    /// changes from other tabs.
    ///
    /// Fails when `[cart].currency` is not the catalog's currency.
    pub fn mount(
        self,
        cache: Cache,
        broadcaster: Broadcaster,
    ) -> Result<CartBridge, CommerceError> {
        let currency = self.config.cart.currency()?;
        if currency != self.catalog.currency() {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.catalog.currency(),
                found: currency,
            });
        }
        let store = cart_store(
            &self.config,
            cache,
            broadcaster,
            Arc::clone(&self.clock),
            self.origin,
        );

        let writing = Arc::new(AtomicBool::new(false));
        let last_write_at = Arc::new(AtomicI64::new(i64::MIN));
        let inbox: Inbox = Arc::new(Mutex::new(VecDeque::new()));

        let subscription = {
            let writing = Arc::clone(&writing);
            let last_write_at = Arc::clone(&last_write_at);
            let inbox = Arc::clone(&inbox);
            let own_origin = store.origin().clone();
            store.subscribe(move |change: &Change<PersistedCart>| {
                if writing.load(Ordering::SeqCst) || change.origin == own_origin {
                    return;
                }
                if change.saved_at < last_write_at.load(Ordering::SeqCst) {
                    debug!(
                        origin = %change.origin,
                        saved_at = change.saved_at,
                        "ignoring stale cart change"
                    );
                    return;
                }
                if let Ok(mut queue) = inbox.lock() {
                    queue.push_back(change.clone());
                }
            })
        };

        let stored = store.get();
        let cart = stored.hydrate(&self.catalog);
        debug!(
            key = %store.storage_key(),
            lines = cart.unique_item_count(),
            coupons = stored.coupons.len(),
            "mounted cart"
        );

        Ok(CartBridge {
            cart,
            coupons: stored.coupons,
            catalog: self.catalog,
            config: self.config.cart,
            clock: self.clock,
            store,
            writing,
            last_write_at,
            inbox,
            _subscription: subscription,
        })
    }
}

/// A tab's cart, mirrored to the shared store.
///
/// The in-memory cart is authoritative for the tab: store failures are
/// logged and otherwise ignored.
pub struct CartBridge {
    cart: Cart,
    coupons: Vec<String>,
    catalog: Arc<Catalog>,
    config: CartConfig,
    clock: Arc<dyn Clock>,
    store: PersistedState<PersistedCart>,
    writing: Arc<AtomicBool>,
    last_write_at: Arc<AtomicI64>,
    inbox: Inbox,
    _subscription: Subscription,
}

impl CartBridge {
    /// Start configuring a bridge over `catalog`.
    pub fn builder(catalog: Arc<Catalog>, config: ShopConfig) -> CartBridgeBuilder {
        CartBridgeBuilder {
            catalog,
            config,
            clock: Arc::new(SystemClock),
            origin: None,
        }
    }

    /// Apply a cart operation and store the result.
    ///
    /// Nothing is stored while a buy-now purchase is in progress.
    pub fn dispatch(&mut self, action: &CartAction) -> &Cart {
        self.apply_remote_changes();
        self.cart.apply(action);
        debug!(action = action.name(), total = %self.cart.total(), "cart updated");
        self.persist();
        &self.cart
    }

    /// Apply queued changes from other tabs. Returns how many were applied.
    ///
    /// A change replaces the cart's items wholesale, or only the backup
    /// while a buy-now purchase is in progress.
    pub fn apply_remote_changes(&mut self) -> usize {
        let pending: Vec<Change<PersistedCart>> = match self.inbox.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => return 0,
        };

        let mut applied = 0;
        for change in pending {
            if change.saved_at < self.last_write_at.load(Ordering::SeqCst) {
                debug!(
                    origin = %change.origin,
                    saved_at = change.saved_at,
                    "dropping stale cart change"
                );
                continue;
            }
            let remote = change.value.hydrate(&self.catalog);
            if self.cart.is_direct_order() {
                self.cart.replace_backup_items(remote.into_items());
            } else {
                self.cart = remote;
            }
            self.coupons = change.value.coupons;
            self.last_write_at.fetch_max(change.saved_at, Ordering::SeqCst);
            debug!(
                origin = %change.origin,
                lines = self.cart.unique_item_count(),
                "applied cart change"
            );
            applied += 1;
        }
        applied
    }

    /// Remember a coupon code. Returns `false` for blank, duplicate or
    /// over-limit codes.
    pub fn add_coupon(&mut self, code: &str) -> bool {
        self.apply_remote_changes();
        let code = code.trim();
        if code.is_empty()
            || self.coupons.iter().any(|c| c == code)
            || self.coupons.len() >= self.config.max_coupons
        {
            return false;
        }
        self.coupons.push(code.to_string());
        self.persist();
        true
    }

    /// Forget a coupon code. Returns whether it was present.
    pub fn remove_coupon(&mut self, code: &str) -> bool {
        self.apply_remote_changes();
        let before = self.coupons.len();
        self.coupons.retain(|c| c != code);
        let removed = self.coupons.len() < before;
        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear_coupons(&mut self) {
        self.apply_remote_changes();
        if !self.coupons.is_empty() {
            self.coupons.clear();
            self.persist();
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Entered coupon codes, in entry order.
    pub fn coupons(&self) -> &[String] {
        &self.coupons
    }

    pub fn currency(&self) -> Currency {
        self.cart.currency()
    }

    pub fn origin(&self) -> &OriginId {
        self.store.origin()
    }

    /// Number of changes from other tabs waiting to be applied.
    pub fn pending_changes(&self) -> usize {
        self.inbox.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    fn persist(&mut self) {
        if self.cart.is_direct_order() {
            debug!("buy-now in progress, not storing cart");
            return;
        }

        let now = self.clock.now_millis();
        self.last_write_at.fetch_max(now, Ordering::SeqCst);
        let snapshot = PersistedCart::from_cart(&self.cart, &self.coupons, now);

        self.writing.store(true, Ordering::SeqCst);
        let result = self.store.set(snapshot);
        self.writing.store(false, Ordering::SeqCst);

        match result {
            Ok(receipt) => {
                self.last_write_at.fetch_max(receipt.saved_at, Ordering::SeqCst);
                debug!(key = %self.store.storage_key(), bytes = receipt.bytes, "stored cart");
            }
            Err(e) => {
                warn!(key = %self.store.storage_key(), error = %e, "failed to store cart");
            }
        }
    }
}

impl std::fmt::Debug for CartBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartBridge")
            .field("cart", &self.cart)
            .field("coupons", &self.coupons)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::ids::{LineKey, ProductId};
    use crate::money::Money;
    use shop_cache::{KvStore, ManualClock, MemoryStore};

    const CATALOG: &str = r#"[
        { "id": "tshirt", "name": "T-Shirt", "price": 300,
          "variations": ["White-S", "Black-M"] },
        { "id": "mug", "name": "Mug", "price": 250 },
        { "id": "hoodie", "name": "Hoodie", "price": 900 }
    ]"#;

    struct Tab {
        store: MemoryStore,
        hub: Broadcaster,
        clock: ManualClock,
        catalog: Arc<Catalog>,
    }

    impl Tab {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                hub: Broadcaster::new(),
                clock: ManualClock::new(1_000),
                catalog: Arc::new(Catalog::from_json(CATALOG).unwrap()),
            }
        }

        fn mount(&self, config: ShopConfig) -> CartBridge {
            CartBridge::builder(Arc::clone(&self.catalog), config)
                .clock(Arc::new(self.clock.clone()))
                .mount(Cache::new(Arc::new(self.store.clone())), self.hub.clone())
                .unwrap()
        }

        fn product(&self, id: &str) -> Product {
            self.catalog.get(&ProductId::new(id)).unwrap().clone()
        }

        fn stored(&self) -> serde_json::Value {
            let raw = self.store.get("shop:persist:cart").unwrap().unwrap();
            serde_json::from_slice(&raw).unwrap()
        }
    }

    #[test]
    fn test_mount_empty_store() {
        let tab = Tab::new();
        let bridge = tab.mount(ShopConfig::default());
        assert!(bridge.cart().is_empty());
        assert!(bridge.coupons().is_empty());
        assert_eq!(bridge.currency(), Currency::BDT);
    }

    #[test]
    fn test_dispatch_writes_whole_cart() {
        let tab = Tab::new();
        let mut bridge = tab.mount(ShopConfig::default());
        bridge.dispatch(&CartAction::add_item(&tab.product("tshirt"), Some("White-S")));
        bridge.dispatch(&CartAction::add_item(&tab.product("mug"), None));

        let stored = tab.stored();
        assert_eq!(stored["v"], 1);
        assert_eq!(stored["data"]["items"].as_array().unwrap().len(), 2);
        assert_eq!(stored["data"]["items"][0]["sku"], "White-S");
        assert_eq!(stored["data"]["items"][0]["qty"], 1);
    }

    #[test]
    fn test_remount_restores_cart() {
        let tab = Tab::new();
        {
            let mut bridge = tab.mount(ShopConfig::default());
            bridge.dispatch(&CartAction::add_item(&tab.product("tshirt"), Some("Black-M")));
            bridge.dispatch(&CartAction::add_item(&tab.product("tshirt"), Some("Black-M")));
            assert!(bridge.add_coupon("EID10"));
        }
        let bridge = tab.mount(ShopConfig::default());
        let line = bridge.cart().get_item(&LineKey::new("tshirt::black-m")).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(bridge.cart().total(), Money::from_major(600, Currency::BDT));
        assert_eq!(bridge.coupons(), ["EID10".to_string()]);
    }

    #[test]
    fn test_direct_order_is_not_stored() {
        let tab = Tab::new();
        let mut bridge = tab.mount(ShopConfig::default());
        bridge.dispatch(&CartAction::add_item(&tab.product("mug"), None));
        let before = tab.stored();

        tab.clock.advance(10);
        bridge.dispatch(&CartAction::set_direct_order(&tab.product("hoodie"), None, 1));
        assert!(bridge.cart().is_direct_order());
        assert_eq!(tab.stored(), before);

        tab.clock.advance(10);
        bridge.dispatch(&CartAction::FinalizeDirectOrder);
        assert_eq!(tab.stored()["data"]["items"], before["data"]["items"]);
    }

    #[test]
    fn test_own_writes_are_not_queued() {
        let tab = Tab::new();
        let mut bridge = tab.mount(ShopConfig::default());
        bridge.dispatch(&CartAction::add_item(&tab.product("mug"), None));
        assert_eq!(bridge.pending_changes(), 0);
        assert_eq!(bridge.apply_remote_changes(), 0);
    }

    #[test]
    fn test_coupons() {
        let tab = Tab::new();
        let config = ShopConfig::from_toml_str("[cart]\nmax_coupons = 2").unwrap();
        let mut bridge = tab.mount(config);

        assert!(bridge.add_coupon("  EID10 "));
        assert!(!bridge.add_coupon("EID10"));
        assert!(!bridge.add_coupon("   "));
        assert!(bridge.add_coupon("FREESHIP"));
        assert!(!bridge.add_coupon("THIRD"));
        assert_eq!(bridge.coupons(), ["EID10".to_string(), "FREESHIP".to_string()]);
        assert_eq!(tab.stored()["data"]["coupons"][1], "FREESHIP");

        assert!(bridge.remove_coupon("EID10"));
        assert!(!bridge.remove_coupon("EID10"));
        bridge.clear_coupons();
        assert!(bridge.coupons().is_empty());
        assert_eq!(tab.stored()["data"]["coupons"], serde_json::json!([]));
    }

    #[test]
    fn test_oversized_cart_keeps_working_in_memory() {
        let tab = Tab::new();
        let config = ShopConfig::from_toml_str("[persist]\nmax_bytes = 64").unwrap();
        let mut bridge = tab.mount(config);
        bridge.dispatch(&CartAction::add_item(&tab.product("tshirt"), Some("White-S")));

        assert_eq!(bridge.cart().item_count(), 1);
        assert!(tab.store.get("shop:persist:cart").unwrap().is_none());
    }

    #[test]
    fn test_currency_must_match_catalog() {
        let tab = Tab::new();
        let config = ShopConfig::from_toml_str("[cart]\ncurrency = \"USD\"").unwrap();
        let result = CartBridge::builder(Arc::clone(&tab.catalog), config)
            .mount(Cache::in_memory(), Broadcaster::new());
        assert!(matches!(
            result,
            Err(CommerceError::CurrencyMismatch {
                expected: Currency::BDT,
                found: Currency::USD,
            })
        ));
    }

    #[test]
    fn test_migrated_cart_is_not_queued_as_remote_change() {
        let tab = Tab::new();
        let envelope = serde_json::json!({
            "v": 0,
            "t": 500,
            "data": { "items": [{ "id": "mug", "qty": 2 }] }
        });
        tab.store
            .set("shop:persist:cart", envelope.to_string().as_bytes())
            .unwrap();

        let mut bridge = tab.mount(ShopConfig::default());
        assert_eq!(tab.stored()["v"], 1);
        assert_eq!(bridge.pending_changes(), 0);

        bridge.dispatch(&CartAction::add_item(&tab.product("mug"), None));
        let line = bridge.cart().get_item(&LineKey::new("mug::default")).unwrap();
        assert_eq!(line.quantity, 3);
    }

    #[test]
    fn test_unknown_currency_fails_mount() {
        let tab = Tab::new();
        let mut config = ShopConfig::default();
        config.cart.currency = "XYZ".to_string();
        let result = CartBridge::builder(Arc::clone(&tab.catalog), config)
            .mount(Cache::in_memory(), Broadcaster::new());
        assert!(matches!(result, Err(CommerceError::ConfigError(_))));
    }
}
