//! The in-memory product list carts resolve against.

use std::collections::{HashMap, HashSet};

use crate::catalog::Product;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Currency;

/// A validated, read-only set of products, kept in authoring order.
///
/// Every product is priced in one currency. Prices read from JSON are in
/// the default currency.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
    currency: Currency,
}

impl Catalog {
    /// Build a catalog, rejecting malformed products.
    pub fn from_products(products: Vec<Product>) -> Result<Self, CommerceError> {
        let currency = products
            .first()
            .map(|p| p.base_price.currency)
            .unwrap_or_default();
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            validate_product(product)?;
            if product.base_price.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency,
                    found: product.base_price.currency,
                });
            }
            if index.insert(product.id.clone(), position).is_some() {
                return Err(CommerceError::DuplicateProduct(product.id.to_string()));
            }
        }
        Ok(Self {
            products,
            index,
            currency,
        })
    }

    /// Parse a JSON array of products.
    pub fn from_json(json: &str) -> Result<Self, CommerceError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Self::from_products(products)
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.index.get(id).map(|&i| &self.products[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Currency every price in the catalog is in.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Products in one category, in catalog order.
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Product> {
        self.products
            .iter()
            .filter(move |p| p.category.eq_ignore_ascii_case(category))
    }
}

fn validate_product(product: &Product) -> Result<(), CommerceError> {
    if product.id.as_str().trim().is_empty() {
        return Err(CommerceError::EmptyProductId);
    }

    let mut labels = HashSet::new();
    for variant in &product.variations {
        let label = variant.label().trim().to_lowercase();
        if !labels.insert(label) {
            return Err(CommerceError::DuplicateVariant {
                product_id: product.id.to_string(),
                label: variant.label().to_string(),
            });
        }
    }

    if product.bulk_rates.iter().any(|rate| rate.units == 0) {
        return Err(CommerceError::InvalidBulkRate(product.id.to_string()));
    }
    Ok(())
}
