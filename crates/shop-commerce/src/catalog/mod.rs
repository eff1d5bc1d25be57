//! Product catalog module.
//!
//! Contains products, their variants and bulk rates, and the catalog that
//! holds them.

#[allow(clippy::module_inception)]
mod catalog;
mod product;
mod variant;

pub use catalog::Catalog;
pub use product::Product;
pub use variant::{
    normalize_variants, BulkRate, ImageSet, NormalizedVariant, VariantInput, VariationSchema,
};
