//! Variation tiers: splitting labels like `"White-L"` or `"A4-Blank-150"`
//! into named tiers and back.
//!
//! Products with a [`VariationSchema`] are parsed positionally against its
//! keys. Products without one go through a legacy heuristic that recognizes
//! sizes and a fixed list of color words; it is ambiguous for anything else
//! and only kept so older catalog entries keep their behavior.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::catalog::{NormalizedVariant, VariationSchema};

/// Label token separator.
pub const TIER_SEPARATOR: char = '-';

/// Canonical size order.
pub const SIZE_ORDER: [&str; 7] = ["XS", "S", "M", "L", "XL", "XXL", "XXXL"];

/// Recognized color words, in canonical order.
pub const COLOR_ORDER: [&str; 12] = [
    "white", "black", "red", "blue", "green", "yellow", "purple", "pink", "orange", "gray",
    "grey", "brown",
];

/// Ordered map of tier name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariationTiers {
    entries: Vec<(String, String)>,
}

impl VariationTiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tier, keeping its position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariationTiers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tiers = VariationTiers::new();
        for (k, v) in iter {
            tiers.insert(k, v);
        }
        tiers
    }
}

/// Split a label into trimmed, non-empty tokens.
pub fn split_label(label: &str) -> Vec<&str> {
    label
        .split(TIER_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// `XS`..`XXXL`, a bare number, or a paper size such as `A4`.
pub fn is_size_token(token: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let upper = token.to_ascii_uppercase();
    SIZE_ORDER.contains(&upper.as_str())
        || all_digits(token)
        || upper.strip_prefix('A').is_some_and(all_digits)
}

pub fn is_color_token(token: &str) -> bool {
    COLOR_ORDER.contains(&token.to_ascii_lowercase().as_str())
}

/// Parse a label into tiers.
///
/// With a schema, tokens take the schema's keys in order and any surplus
/// tokens get `tier{n}` (1-based position). A schema with no keys counts as
/// absent.
pub fn parse_variation_tiers(label: &str, schema: Option<&VariationSchema>) -> VariationTiers {
    let tokens = split_label(label);

    if let Some(schema) = schema.filter(|s| !s.keys.is_empty()) {
        return tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let key = schema
                    .keys
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("tier{}", i + 1));
                (key, token.to_string())
            })
            .collect();
    }

    match tokens.as_slice() {
        [] => VariationTiers::new(),
        [only] => {
            let key = if is_size_token(only) {
                "size"
            } else if is_color_token(only) {
                "color"
            } else {
                "option"
            };
            VariationTiers::from_iter([(key, *only)])
        }
        [first, second] => {
            if is_color_token(first) && is_size_token(second) {
                VariationTiers::from_iter([("color", *first), ("size", *second)])
            } else if is_size_token(first) && is_color_token(second) {
                VariationTiers::from_iter([("size", *first), ("color", *second)])
            } else {
                VariationTiers::from_iter([("primary", *first), ("secondary", *second)])
            }
        }
        many => many
            .iter()
            .enumerate()
            .map(|(i, token)| (format!("tier{}", i + 1), token.to_string()))
            .collect(),
    }
}

/// Join tier values with `-`, in `order` if given, else insertion order.
/// Empty values are skipped.
pub fn format_variation_label(tiers: &VariationTiers, order: Option<&[String]>) -> String {
    let values: Vec<&str> = match order {
        Some(order) => order.iter().filter_map(|k| tiers.get(k)).collect(),
        None => tiers.iter().map(|(_, v)| v).collect(),
    };
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Tier names for a product: the schema's keys verbatim, else every key
/// found by parsing the labels, deduplicated and sorted.
pub fn variation_tier_keys(
    variants: &[NormalizedVariant],
    schema: Option<&VariationSchema>,
) -> Vec<String> {
    if let Some(schema) = schema.filter(|s| !s.keys.is_empty()) {
        return schema.keys.clone();
    }
    let keys: BTreeSet<String> = variants
        .iter()
        .flat_map(|v| {
            parse_variation_tiers(&v.label, None)
                .keys()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    keys.into_iter().collect()
}

/// Distinct values seen for `key`, sorted for display.
///
/// `size` and `color` values follow [`SIZE_ORDER`] / [`COLOR_ORDER`], with
/// unrecognized values after the recognized ones. Everything else sorts
/// numerically when both sides are numbers, otherwise alphabetically.
pub fn variation_tier_values(
    variants: &[NormalizedVariant],
    key: &str,
    schema: Option<&VariationSchema>,
) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for variant in variants {
        let tiers = parse_variation_tiers(&variant.label, schema);
        if let Some(value) = tiers.get(key).filter(|v| !v.is_empty()) {
            if !values.iter().any(|v| v == value) {
                values.push(value.to_string());
            }
        }
    }
    values.sort_by(|a, b| compare_tier_values(key, a, b));
    values
}

fn canonical_position(key: &str, value: &str) -> Option<usize> {
    match key {
        "size" => {
            let upper = value.to_ascii_uppercase();
            SIZE_ORDER.iter().position(|s| *s == upper)
        }
        "color" => {
            let lower = value.to_ascii_lowercase();
            COLOR_ORDER.iter().position(|c| *c == lower)
        }
        _ => None,
    }
}

fn compare_tier_values(key: &str, a: &str, b: &str) -> Ordering {
    match (canonical_position(key, a), canonical_position(key, b)) {
        (Some(x), Some(y)) => return x.cmp(&y),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => {}
    }
    if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
        if let Some(ordering) = x.partial_cmp(&y) {
            return ordering;
        }
    }
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Colors offered by a product without a schema.
pub fn unique_colors(variants: &[NormalizedVariant]) -> Vec<String> {
    variation_tier_values(variants, "color", None)
}

/// Sizes offered by a product without a schema.
pub fn unique_sizes(variants: &[NormalizedVariant]) -> Vec<String> {
    variation_tier_values(variants, "size", None)
}

/// The variant whose label is the formatted `tiers`.
///
/// Uses the schema's key order when there is one.
pub fn variant_by_tiers<'a>(
    variants: &'a [NormalizedVariant],
    tiers: &VariationTiers,
    schema: Option<&VariationSchema>,
) -> Option<&'a NormalizedVariant> {
    let order = schema.filter(|s| !s.keys.is_empty()).map(|s| s.keys.as_slice());
    let label = format_variation_label(tiers, order);
    variants.iter().find(|v| v.matches(&label))
}
