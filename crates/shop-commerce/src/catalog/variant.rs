//! Variant, image, schema and bulk-rate types.

use std::collections::BTreeMap;

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// One image URL or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSet {
    One(String),
    Many(Vec<String>),
}

impl Default for ImageSet {
    fn default() -> Self {
        ImageSet::Many(Vec::new())
    }
}

impl ImageSet {
    /// URLs in display order, blanks removed.
    pub fn urls(&self) -> Vec<String> {
        match self {
            ImageSet::One(url) if !url.trim().is_empty() => vec![url.clone()],
            ImageSet::One(_) => Vec::new(),
            ImageSet::Many(urls) => urls
                .iter()
                .filter(|url| !url.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.urls().is_empty()
    }
}

impl From<&str> for ImageSet {
    fn from(url: &str) -> Self {
        ImageSet::One(url.to_string())
    }
}

impl From<Vec<String>> for ImageSet {
    fn from(urls: Vec<String>) -> Self {
        ImageSet::Many(urls)
    }
}

/// A variant as authored in the catalog: a bare label, or a label with
/// its own price and images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariantInput {
    Label(String),
    Detailed {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<ImageSet>,
    },
}

impl VariantInput {
    pub fn label(&self) -> &str {
        match self {
            VariantInput::Label(label) => label,
            VariantInput::Detailed { label, .. } => label,
        }
    }

    /// Convert to the canonical shape.
    ///
    /// Prices that are negative or not finite are dropped so the variant
    /// falls back to the product's base price.
    pub fn normalize(&self, currency: Currency) -> NormalizedVariant {
        match self {
            VariantInput::Label(label) => NormalizedVariant {
                label: label.clone(),
                price: None,
                image: None,
            },
            VariantInput::Detailed {
                label,
                price,
                image,
            } => NormalizedVariant {
                label: label.clone(),
                price: price
                    .filter(|p| *p >= 0.0)
                    .and_then(|p| Money::try_from_decimal(p, currency)),
                image: image.clone(),
            },
        }
    }
}

impl From<&str> for VariantInput {
    fn from(label: &str) -> Self {
        VariantInput::Label(label.to_string())
    }
}

/// Canonical variant record every resolver works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedVariant {
    pub label: String,
    pub price: Option<Money>,
    pub image: Option<ImageSet>,
}

impl NormalizedVariant {
    /// A variant with only a label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            price: None,
            image: None,
        }
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_image(mut self, image: impl Into<ImageSet>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Case-insensitive, whitespace-trimmed label comparison.
    pub fn matches(&self, selected: &str) -> bool {
        let selected = selected.trim();
        !selected.is_empty() && self.label.trim().to_lowercase() == selected.to_lowercase()
    }
}

/// Normalize a product's raw variant list.
pub fn normalize_variants(inputs: &[VariantInput], currency: Currency) -> Vec<NormalizedVariant> {
    inputs.iter().map(|v| v.normalize(currency)).collect()
}

/// Ordered tier names for a product's variant labels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariationSchema {
    /// Tier names, in label order.
    pub keys: Vec<String>,
    /// Display titles by tier name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub titles: BTreeMap<String, String>,
}

impl VariationSchema {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            titles: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, key: impl Into<String>, title: impl Into<String>) -> Self {
        self.titles.insert(key.into(), title.into());
        self
    }

    /// Display title for a tier: the configured one, else the key with its
    /// first letter upper-cased.
    pub fn title_for(&self, key: &str) -> String {
        if let Some(title) = self.titles.get(key) {
            return title.clone();
        }
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Procurement cost tier: `units` pieces for a total, or at a per-unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRate {
    pub units: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

impl BulkRate {
    pub fn total(units: u32, total_price: f64) -> Self {
        Self {
            units,
            total_price: Some(total_price),
            unit_price: None,
        }
    }

    pub fn per_unit(units: u32, unit_price: f64) -> Self {
        Self {
            units,
            total_price: None,
            unit_price: Some(unit_price),
        }
    }

    /// Per-unit cost: `unit_price` if set, else `total_price / units`.
    pub fn unit_cost(&self) -> Option<f64> {
        let unit = match (self.unit_price, self.total_price) {
            (Some(unit), _) => unit,
            (None, Some(total)) if self.units > 0 => total / f64::from(self.units),
            _ => return None,
        };
        unit.is_finite().then_some(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_input_parses_both_shapes() {
        let raw = r#"["Black", {"label": "White-S", "price": 300, "image": ["a.jpg", ""]}]"#;
        let variants: Vec<VariantInput> = serde_json::from_str(raw).unwrap();
        assert_eq!(variants[0], VariantInput::Label("Black".to_string()));
        assert_eq!(variants[1].label(), "White-S");

        let normalized = normalize_variants(&variants, Currency::BDT);
        assert_eq!(normalized[0], NormalizedVariant::labeled("Black"));
        assert_eq!(
            normalized[1].price,
            Some(Money::from_major(300, Currency::BDT))
        );
        assert_eq!(
            normalized[1].image.as_ref().map(ImageSet::urls),
            Some(vec!["a.jpg".to_string()])
        );
    }

    #[test]
    fn test_negative_price_is_dropped() {
        let variant = VariantInput::Detailed {
            label: "Odd".to_string(),
            price: Some(-5.0),
            image: None,
        };
        assert_eq!(variant.normalize(Currency::BDT).price, None);
    }

    #[test]
    fn test_variant_matches_ignores_case_and_whitespace() {
        let variant = NormalizedVariant::labeled("White-S");
        assert!(variant.matches("  white-s "));
        assert!(!variant.matches("white-m"));
        assert!(!variant.matches("  "));
    }

    #[test]
    fn test_image_set_urls() {
        assert_eq!(ImageSet::from("a.jpg").urls(), vec!["a.jpg"]);
        assert!(ImageSet::from("  ").is_empty());
        let many: ImageSet = serde_json::from_str(r#"["a.jpg", "", "b.jpg"]"#).unwrap();
        assert_eq!(many.urls(), vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_schema_titles() {
        let schema = VariationSchema::new(["color", "size"]).with_title("color", "Colour");
        assert_eq!(schema.title_for("color"), "Colour");
        assert_eq!(schema.title_for("size"), "Size");
        assert_eq!(schema.title_for(""), "");
    }

    #[test]
    fn test_bulk_rate_unit_cost() {
        assert_eq!(BulkRate::per_unit(100, 2.8).unit_cost(), Some(2.8));
        assert_eq!(BulkRate::total(200, 450.0).unit_cost(), Some(2.25));
        assert_eq!(BulkRate::total(0, 450.0).unit_cost(), None);
        let empty = BulkRate {
            units: 10,
            total_price: None,
            unit_price: None,
        };
        assert_eq!(empty.unit_cost(), None);
    }

    #[test]
    fn test_bulk_rate_camel_case() {
        let rate: BulkRate = serde_json::from_str(r#"{"units": 100, "totalPrice": 280}"#).unwrap();
        assert_eq!(rate, BulkRate::total(100, 280.0));
    }
}
