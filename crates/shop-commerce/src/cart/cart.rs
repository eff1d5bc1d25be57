//! Cart snapshot and line item types.

use crate::catalog::Product;
use crate::ids::{LineKey, ProductId};
use crate::money::{Currency, Money};
use serde::Serialize;

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: u32 = 9999;

/// A line in the cart.
///
/// Price and image are resolved when the line is created and not
/// re-resolved afterwards, so catalog edits never reprice a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// `"{product_id}::{variation}"`, unique within a cart.
    pub line_key: LineKey,
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    /// Unit price at the time of adding.
    pub unit_price: Money,
    /// Lead image at the time of adding, or empty.
    pub image: String,
    pub category: String,
    /// Quantity, between 1 and [`MAX_QUANTITY_PER_ITEM`].
    pub quantity: u32,
    /// Selected variation label as the shopper picked it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_variation: Option<String>,
}

impl LineItem {
    /// Resolve a line for `product` with the given variation.
    pub fn from_product(
        product: &Product,
        selected_variation: Option<&str>,
        quantity: u32,
    ) -> Self {
        let selected_variation = selected_variation
            .map(str::trim)
            .filter(|label| !label.is_empty());
        Self {
            line_key: LineKey::for_item(&product.id, selected_variation),
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price_for(selected_variation),
            image: product.image_for(selected_variation),
            category: product.category.clone(),
            quantity: clamp_quantity(i64::from(quantity)),
            selected_variation: selected_variation.map(str::to_string),
        }
    }

    /// `unit_price * quantity`.
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// The key this line should have given its product and variation.
    pub fn normalized_key(&self) -> LineKey {
        LineKey::for_item(&self.product_id, self.selected_variation.as_deref())
    }
}

/// Clamp a requested quantity to `1..=MAX_QUANTITY_PER_ITEM`.
pub(crate) fn clamp_quantity(quantity: i64) -> u32 {
    quantity.clamp(1, i64::from(MAX_QUANTITY_PER_ITEM)) as u32
}

/// A shopping cart snapshot.
///
/// `total` is recomputed from `items` after every operation and cannot be
/// set directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<LineItem>,
    total: Money,
    is_direct_order: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_items: Option<Vec<LineItem>>,
}

impl Cart {
    /// An empty cart priced in `currency`.
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            total: Money::zero(currency),
            is_direct_order: false,
            backup_items: None,
        }
    }

    /// A regular cart holding `items`.
    pub fn from_items(items: Vec<LineItem>, currency: Currency) -> Self {
        let mut cart = Self::new(currency);
        cart.items = items;
        cart.recompute_total();
        cart
    }

    /// Add one unit of a product, merging into an existing line with the
    /// same key. Leaves direct-order mode.
    pub fn add_item(&mut self, product: &Product, selected_variation: Option<&str>) {
        let line_key = LineKey::for_item(&product.id, selected_variation);
        match self.items.iter_mut().find(|i| i.line_key == line_key) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .saturating_add(1)
                    .min(MAX_QUANTITY_PER_ITEM);
            }
            None => self
                .items
                .push(LineItem::from_product(product, selected_variation, 1)),
        }
        self.leave_direct_order();
        self.recompute_total();
    }

    /// Remove a line. Leaves direct-order mode. Unknown keys are ignored.
    pub fn remove_item(&mut self, line_key: &LineKey) {
        if self.get_item(line_key).is_none() {
            return;
        }
        self.items.retain(|i| &i.line_key != line_key);
        self.leave_direct_order();
        self.recompute_total();
    }

    /// Set a line's quantity. Zero or less removes the line; direct-order
    /// state is kept. Unknown keys are ignored.
    pub fn update_quantity(&mut self, line_key: &LineKey, quantity: i64) {
        if self.get_item(line_key).is_none() {
            return;
        }
        if quantity <= 0 {
            self.items.retain(|i| &i.line_key != line_key);
        } else if let Some(item) = self.items.iter_mut().find(|i| &i.line_key == line_key) {
            item.quantity = clamp_quantity(quantity);
        }
        self.recompute_total();
    }

    /// Reset to the empty cart.
    pub fn clear(&mut self) {
        *self = Self::new(self.currency());
    }

    /// Replace the items with a single buy-now line.
    ///
    /// The current items are backed up on first entry only; calling this
    /// again while in direct-order mode keeps the original backup.
    pub fn set_direct_order(
        &mut self,
        product: &Product,
        selected_variation: Option<&str>,
        quantity: u32,
    ) {
        if !self.is_direct_order {
            self.backup_items = Some(std::mem::take(&mut self.items));
        }
        self.items = vec![LineItem::from_product(product, selected_variation, quantity)];
        self.is_direct_order = true;
        self.recompute_total();
    }

    /// Finish a buy-now purchase: restore the backed-up items, or empty the
    /// cart if there is nothing to restore.
    pub fn finalize_direct_order(&mut self) {
        match (self.is_direct_order, self.backup_items.take()) {
            (true, Some(backup)) => {
                self.items = backup;
                self.is_direct_order = false;
                self.recompute_total();
            }
            _ => self.clear(),
        }
    }

    /// Merge lines that share a normalized key, summing their quantities
    /// and keeping the first line's position and resolved details.
    pub fn squash_duplicates(&mut self) {
        if self.items.len() <= 1 {
            return;
        }
        let mut merged: Vec<LineItem> = Vec::with_capacity(self.items.len());
        for mut item in std::mem::take(&mut self.items) {
            item.line_key = item.normalized_key();
            match merged.iter_mut().find(|m| m.line_key == item.line_key) {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .saturating_add(item.quantity)
                        .min(MAX_QUANTITY_PER_ITEM);
                }
                None => merged.push(item),
            }
        }
        self.items = merged;
        self.recompute_total();
    }

    /// Swap in a new backup while in direct-order mode.
    pub(crate) fn replace_backup_items(&mut self, items: Vec<LineItem>) {
        if self.is_direct_order {
            self.backup_items = Some(items);
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub(crate) fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Sum of `unit_price * quantity` over the items.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn currency(&self) -> Currency {
        self.total.currency
    }

    pub fn is_direct_order(&self) -> bool {
        self.is_direct_order
    }

    /// Items set aside by a buy-now purchase.
    pub fn backup_items(&self) -> Option<&[LineItem]> {
        self.backup_items.as_deref()
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Get number of distinct lines.
    pub fn unique_item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_item(&self, line_key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.line_key == line_key)
    }

    fn leave_direct_order(&mut self) {
        self.is_direct_order = false;
        self.backup_items = None;
    }

    fn recompute_total(&mut self) {
        let amount = self
            .items
            .iter()
            .fold(0_i64, |sum, item| sum.saturating_add(item.subtotal().amount_minor));
        self.total = Money::new(amount, self.currency());
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}
