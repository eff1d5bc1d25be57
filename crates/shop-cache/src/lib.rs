//! Versioned key-value persistence for the merch shop.
//!
//! Provides the durable store the storefront keeps its cart in: a raw
//! [`KvStore`] port, a typed [`Cache`] over it, and [`PersistedState`]
//! values wrapped in versioned, expiring, size-capped envelopes whose
//! changes are broadcast to every tab sharing the store.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_cache::prelude::*;
//!
//! let cache = Cache::in_memory();
//! let hub = Broadcaster::new();
//! let config = PersistConfig::default();
//!
//! let wishlist = PersistedState::builder(config.options_for("wishlist"), Vec::<String>::new)
//!     .build(cache, hub);
//!
//! wishlist.update(|mut ids| {
//!     ids.push("tshirt".to_string());
//!     ids
//! })?;
//! ```

mod broadcast;
mod clock;
mod config;
mod error;
mod kv;
mod origin;
mod persisted;

pub use broadcast::{Broadcaster, Message, Subscription};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{PersistConfig, PersistOptions};
pub use error::CacheError;
pub use kv::{Cache, KvStore, MemoryStore};
pub use origin::OriginId;
pub use persisted::{
    Change, Envelope, PersistedState, PersistedStateBuilder, QuotaEviction, SaveReceipt,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Broadcaster, Cache, CacheError, Change, Clock, KvStore, MemoryStore, OriginId,
        PersistConfig, PersistedState, SystemClock,
    };
}
