//! Price and image resolution for a selected variation, and bulk-rate
//! procurement costs.
//!
//! Every lookup misses softly: an unknown or empty selection resolves to the
//! product's base price and images.

use crate::catalog::{BulkRate, ImageSet, NormalizedVariant};
use crate::money::{Currency, Money};

/// Lowest and highest effective price across a product's variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
}

impl PriceRange {
    /// A range holding one price.
    pub fn single(price: Money) -> Self {
        Self {
            min: price,
            max: price,
        }
    }

    /// Whether every variant costs the same.
    pub fn is_single(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, price: &Money) -> bool {
        self.min <= *price && *price <= self.max
    }

    /// "৳300.00" or "৳300.00 - ৳450.00".
    pub fn display(&self) -> String {
        if self.is_single() {
            self.min.display()
        } else {
            format!("{} - {}", self.min.display(), self.max.display())
        }
    }
}

/// The variant whose label matches `selected`, ignoring case and
/// surrounding whitespace.
pub fn find_variant<'a>(
    variants: &'a [NormalizedVariant],
    selected: Option<&str>,
) -> Option<&'a NormalizedVariant> {
    let selected = selected?;
    variants.iter().find(|v| v.matches(selected))
}

/// A variant's own price when it has a usable one, else `base_price`.
pub fn effective_price(variant: &NormalizedVariant, base_price: Money) -> Money {
    match variant.price {
        Some(price) if !price.is_negative() => price,
        _ => base_price,
    }
}

/// Unit price for the selected variation.
pub fn variation_price(
    base_price: Money,
    variants: &[NormalizedVariant],
    selected: Option<&str>,
) -> Money {
    find_variant(variants, selected)
        .map(|v| effective_price(v, base_price))
        .unwrap_or(base_price)
}

/// Price band across all variants; a product without variants spans only
/// its base price.
pub fn min_max_price(base_price: Money, variants: &[NormalizedVariant]) -> PriceRange {
    let mut prices = variants.iter().map(|v| effective_price(v, base_price));
    let Some(first) = prices.next() else {
        return PriceRange::single(base_price);
    };
    prices.fold(PriceRange::single(first), |range, price| PriceRange {
        min: range.min.min(price),
        max: range.max.max(price),
    })
}

/// Images to show for the selected variation.
///
/// Priority: the matched variant's own images, then the product's images.
/// Blank URLs are dropped; a variant whose images are all blank falls back
/// to the product's.
pub fn product_images(
    base_image: &ImageSet,
    variants: &[NormalizedVariant],
    selected: Option<&str>,
) -> Vec<String> {
    let own = find_variant(variants, selected)
        .and_then(|v| v.image.as_ref())
        .map(ImageSet::urls)
        .filter(|urls| !urls.is_empty());
    own.unwrap_or_else(|| base_image.urls())
}

/// First image for the selected variation, or an empty string.
pub fn variation_image(
    base_image: &ImageSet,
    variants: &[NormalizedVariant],
    selected: Option<&str>,
) -> String {
    product_images(base_image, variants, selected)
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// The bulk tier in effect for `units_sold`.
///
/// Exact match first, then the largest tier at or below `units_sold`, then
/// the smallest tier.
pub fn pick_active_bulk_rate(rates: &[BulkRate], units_sold: Option<u32>) -> Option<&BulkRate> {
    let units_sold = units_sold?;
    let mut sorted: Vec<&BulkRate> = rates.iter().collect();
    sorted.sort_by_key(|r| r.units);

    if let Some(exact) = sorted.iter().find(|r| r.units == units_sold).copied() {
        return Some(exact);
    }
    sorted
        .iter()
        .rev()
        .find(|r| r.units <= units_sold)
        .or_else(|| sorted.first())
        .copied()
}

/// Per-unit procurement cost at the active tier, rounded to the currency's
/// minor unit.
pub fn bulk_unit_cost(
    rates: &[BulkRate],
    units_sold: Option<u32>,
    currency: Currency,
) -> Option<Money> {
    let tier = pick_active_bulk_rate(rates, units_sold)?;
    Money::try_from_decimal(tier.unit_cost()?, currency)
}
