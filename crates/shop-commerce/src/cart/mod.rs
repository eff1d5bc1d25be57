//! Shopping cart module.
//!
//! Contains the cart snapshot and its operations, the stored cart format,
//! and the bridge that keeps a tab's cart in step with the shared store.

mod action;
#[allow(clippy::module_inception)]
mod cart;
mod persisted;
mod sync;

pub use action::CartAction;
pub(crate) use cart::clamp_quantity;
pub use cart::{Cart, LineItem, MAX_QUANTITY_PER_ITEM};
pub use persisted::{cart_store, sanitize_cart, PersistedCart, PersistedLineItem};
pub use sync::{CartBridge, CartBridgeBuilder};
