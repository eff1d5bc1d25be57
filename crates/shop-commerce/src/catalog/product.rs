//! Product type.

use crate::catalog::{
    normalize_variants, BulkRate, ImageSet, NormalizedVariant, VariantInput, VariationSchema,
};
use crate::ids::ProductId;
use crate::money::{self, Money};
use crate::pricing::{self, PriceRange};
use crate::variation::{self, VariationTiers};
use serde::{Deserialize, Serialize};

/// A product in the catalog.
///
/// When `variations` is empty the product has no variant dimension and its
/// base price and images are authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Base unit price, authored as a decimal number.
    #[serde(rename = "price", with = "money::decimal")]
    pub base_price: Money,
    /// One image or an ordered gallery.
    #[serde(default)]
    pub image: ImageSet,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Variants, as bare labels or with their own price/images.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<VariantInput>,
    /// Tier names for variant labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_schema: Option<VariationSchema>,
    /// Units sold so far; selects the bulk tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_sold: Option<u32>,
    /// Procurement cost tiers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bulk_rates: Vec<BulkRate>,
}

impl Product {
    /// Create a product with no variants.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, base_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_price,
            image: ImageSet::default(),
            description: String::new(),
            category: String::new(),
            variations: Vec::new(),
            variation_schema: None,
            units_sold: None,
            bulk_rates: Vec::new(),
        }
    }

    /// Minimal product rebuilt from what a persisted cart line remembers,
    /// for items whose product is no longer in the catalog.
    pub fn stand_in(
        id: ProductId,
        name: Option<String>,
        unit_price: Money,
        image: Option<String>,
        category: Option<String>,
    ) -> Self {
        let name = name.unwrap_or_else(|| id.to_string());
        let mut product = Self::new(id, name, unit_price);
        product.image = image.map(ImageSet::One).unwrap_or_default();
        product.category = category.unwrap_or_default();
        product
    }

    pub fn with_image(mut self, image: impl Into<ImageSet>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_variations(mut self, variations: Vec<VariantInput>) -> Self {
        self.variations = variations;
        self
    }

    pub fn with_schema(mut self, schema: VariationSchema) -> Self {
        self.variation_schema = Some(schema);
        self
    }

    pub fn with_bulk_rates(mut self, units_sold: u32, rates: Vec<BulkRate>) -> Self {
        self.units_sold = Some(units_sold);
        self.bulk_rates = rates;
        self
    }

    /// Check if the product has a variant dimension.
    pub fn has_variations(&self) -> bool {
        !self.variations.is_empty()
    }

    /// Variants in canonical form, priced in the product's currency.
    pub fn normalized_variations(&self) -> Vec<NormalizedVariant> {
        normalize_variants(&self.variations, self.base_price.currency)
    }

    /// Unit price for a selected variation.
    pub fn price_for(&self, selected: Option<&str>) -> Money {
        pricing::variation_price(self.base_price, &self.normalized_variations(), selected)
    }

    /// Price band across all variants.
    pub fn price_range(&self) -> PriceRange {
        pricing::min_max_price(self.base_price, &self.normalized_variations())
    }

    /// Images for a selected variation.
    pub fn images_for(&self, selected: Option<&str>) -> Vec<String> {
        pricing::product_images(&self.image, &self.normalized_variations(), selected)
    }

    /// Lead image for a selected variation, or an empty string.
    pub fn image_for(&self, selected: Option<&str>) -> String {
        pricing::variation_image(&self.image, &self.normalized_variations(), selected)
    }

    /// Tier names of this product's variants.
    pub fn tier_keys(&self) -> Vec<String> {
        variation::variation_tier_keys(
            &self.normalized_variations(),
            self.variation_schema.as_ref(),
        )
    }

    /// Sorted values offered for one tier.
    pub fn tier_values(&self, key: &str) -> Vec<String> {
        variation::variation_tier_values(
            &self.normalized_variations(),
            key,
            self.variation_schema.as_ref(),
        )
    }

    /// Split a label of this product into tiers.
    pub fn parse_tiers(&self, label: &str) -> VariationTiers {
        variation::parse_variation_tiers(label, self.variation_schema.as_ref())
    }

    /// The variant selected by a full set of tiers.
    pub fn variant_by_tiers(&self, tiers: &VariationTiers) -> Option<NormalizedVariant> {
        let variants = self.normalized_variations();
        variation::variant_by_tiers(&variants, tiers, self.variation_schema.as_ref()).cloned()
    }

    /// The bulk tier in effect for `units_sold`.
    pub fn active_bulk_rate(&self) -> Option<&BulkRate> {
        pricing::pick_active_bulk_rate(&self.bulk_rates, self.units_sold)
    }

    /// Per-unit procurement cost at the active tier.
    pub fn bulk_unit_cost(&self) -> Option<Money> {
        pricing::bulk_unit_cost(&self.bulk_rates, self.units_sold, self.base_price.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    const TSHIRT: &str = r#"{
        "id": "tshirt",
        "name": "T-Shirt",
        "price": 300,
        "image": ["tshirt.jpg", "tshirt-back.jpg"],
        "description": "Cotton tee",
        "category": "clothing",
        "variationSchema": { "keys": ["color", "size"], "titles": { "color": "Color", "size": "Size" } },
        "variations": [
            { "label": "White-S", "price": 300, "image": ["tshirt-white.jpg"] },
            { "label": "Black-XL", "price": 350 },
            "Black-M"
        ]
    }"#;

    fn tk(amount: i64) -> Money {
        Money::from_major(amount, Currency::BDT)
    }

    #[test]
    fn test_product_from_catalog_json() {
        let product: Product = serde_json::from_str(TSHIRT).unwrap();
        assert_eq!(product.id.as_str(), "tshirt");
        assert_eq!(product.base_price, tk(300));
        assert!(product.has_variations());
        assert_eq!(product.variations.len(), 3);
    }

    #[test]
    fn test_product_resolution() {
        let product: Product = serde_json::from_str(TSHIRT).unwrap();
        assert_eq!(product.price_for(Some("black-xl")), tk(350));
        assert_eq!(product.price_for(Some("Black-M")), tk(300));
        assert_eq!(product.price_range().max, tk(350));
        assert_eq!(product.image_for(Some("White-S")), "tshirt-white.jpg");
        assert_eq!(product.image_for(Some("Black-M")), "tshirt.jpg");
        assert_eq!(product.images_for(None).len(), 2);
    }

    #[test]
    fn test_product_tiers() {
        let product: Product = serde_json::from_str(TSHIRT).unwrap();
        assert_eq!(product.tier_keys(), vec!["color", "size"]);
        assert_eq!(product.tier_values("size"), vec!["S", "M", "XL"]);
        assert_eq!(product.tier_values("color"), vec!["White", "Black"]);

        let tiers = product.parse_tiers("Black-XL");
        let variant = product.variant_by_tiers(&tiers).unwrap();
        assert_eq!(variant.price, Some(tk(350)));
    }

    #[test]
    fn test_product_bulk_cost() {
        let sticker = Product::new("sticker", "Sticker", tk(10)).with_bulk_rates(
            240,
            vec![BulkRate::total(100, 280.0), BulkRate::total(200, 450.0)],
        );
        assert_eq!(sticker.active_bulk_rate().map(|r| r.units), Some(200));
        assert_eq!(sticker.bulk_unit_cost(), Some(Money::new(225, Currency::BDT)));
    }

    #[test]
    fn test_stand_in_product() {
        let product = Product::stand_in(
            ProductId::new("retired"),
            None,
            tk(120),
            Some("retired.jpg".to_string()),
            None,
        );
        assert_eq!(product.name, "retired");
        assert_eq!(product.base_price, tk(120));
        assert_eq!(product.image_for(None), "retired.jpg");
        assert!(!product.has_variations());
    }

    #[test]
    fn test_product_serializes_back_to_catalog_shape() {
        let product = Product::new("bottle", "Bottle", tk(400)).with_image("bottle.jpg");
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], serde_json::json!(400.0));
        assert_eq!(json["image"], serde_json::json!("bottle.jpg"));
        assert!(json.get("variations").is_none());
    }
}
