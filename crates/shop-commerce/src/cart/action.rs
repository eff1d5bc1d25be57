//! Cart operations as values, and the reducer that applies them.

use crate::cart::Cart;
use crate::catalog::Product;
use crate::ids::LineKey;

/// An operation on a [`Cart`].
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add one unit of a product.
    AddItem {
        product: Product,
        selected_variation: Option<String>,
    },
    /// Remove a line.
    RemoveItem { line_key: LineKey },
    /// Set a line's quantity; zero or less removes it.
    UpdateQuantity { line_key: LineKey, quantity: i64 },
    /// Reset to the empty cart.
    ClearCart,
    /// Start or change a buy-now purchase.
    SetDirectOrder {
        product: Product,
        selected_variation: Option<String>,
        quantity: u32,
    },
    /// Finish a buy-now purchase and restore the previous items.
    FinalizeDirectOrder,
    /// Merge lines sharing a key.
    SquashDuplicates,
}

impl CartAction {
    pub fn add_item(product: &Product, selected_variation: Option<&str>) -> Self {
        CartAction::AddItem {
            product: product.clone(),
            selected_variation: selected_variation.map(str::to_string),
        }
    }

    pub fn remove_item(line_key: LineKey) -> Self {
        CartAction::RemoveItem { line_key }
    }

    pub fn update_quantity(line_key: LineKey, quantity: i64) -> Self {
        CartAction::UpdateQuantity { line_key, quantity }
    }

    pub fn set_direct_order(
        product: &Product,
        selected_variation: Option<&str>,
        quantity: u32,
    ) -> Self {
        CartAction::SetDirectOrder {
            product: product.clone(),
            selected_variation: selected_variation.map(str::to_string),
            quantity,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            CartAction::AddItem { .. } => "add_item",
            CartAction::RemoveItem { .. } => "remove_item",
            CartAction::UpdateQuantity { .. } => "update_quantity",
            CartAction::ClearCart => "clear_cart",
            CartAction::SetDirectOrder { .. } => "set_direct_order",
            CartAction::FinalizeDirectOrder => "finalize_direct_order",
            CartAction::SquashDuplicates => "squash_duplicates",
        }
    }
}

impl Cart {
    /// The snapshot that results from applying `action`, leaving `self`
    /// unchanged.
    pub fn reduce(&self, action: &CartAction) -> Cart {
        let mut next = self.clone();
        next.apply(action);
        next
    }

    /// Apply `action` in place.
    pub fn apply(&mut self, action: &CartAction) {
        match action {
            CartAction::AddItem {
                product,
                selected_variation,
            } => self.add_item(product, selected_variation.as_deref()),
            CartAction::RemoveItem { line_key } => self.remove_item(line_key),
            CartAction::UpdateQuantity { line_key, quantity } => {
                self.update_quantity(line_key, *quantity)
            }
            CartAction::ClearCart => self.clear(),
            CartAction::SetDirectOrder {
                product,
                selected_variation,
                quantity,
            } => self.set_direct_order(product, selected_variation.as_deref(), *quantity),
            CartAction::FinalizeDirectOrder => self.finalize_direct_order(),
            CartAction::SquashDuplicates => self.squash_duplicates(),
        }
    }
}
