use serde::{Deserialize, Serialize};

use crate::domain::contains_ignore_case;
use crate::domain::supplier::SupplierId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub supplier_id: SupplierId,
}

/// Product attributes accepted by the catalog write path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub brand: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub supplier_id: SupplierId,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidProduct("name must not be empty".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::InvalidProduct(format!(
                "price must be a non-negative number (got {})",
                self.price
            )));
        }
        Ok(())
    }

    pub fn with_id(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            brand: self.brand,
            price: self.price,
            category: self.category,
            description: self.description,
            supplier_id: self.supplier_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    /// Lenient parse used for model-extracted sort hints ("price_desc", "Price Desc", "descending").
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "price_asc" | "asc" | "ascending" | "cheapest" | "price_low_to_high" => {
                Some(Self::PriceAsc)
            }
            "price_desc" | "desc" | "descending" | "most_expensive" | "price_high_to_low" => {
                Some(Self::PriceDesc)
            }
            _ => None,
        }
    }
}

/// Conjunctive product predicate. Every `None` field is unconstrained.
///
/// `category`, `name` and `brand` match as case-insensitive substrings and `text` matches
/// name, brand or description. `id`, `description`, `price` and `supplier_id` match exactly.
/// Price bounds are inclusive. Unknown keys are rejected when decoding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductFilter {
    // Filled from the search query, never from decoded filters.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<SupplierId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<ProductSort>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_exact(product) && self.matches_text(product)
    }

    /// Equality and range predicates. The SQL repository evaluates these in the query.
    fn matches_exact(&self, product: &Product) -> bool {
        self.id.map_or(true, |id| product.id == id)
            && self.description.as_deref().map_or(true, |text| product.description == text)
            && self.price.map_or(true, |price| product.price == price)
            && self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max)
            && self.supplier_id.map_or(true, |supplier_id| product.supplier_id == supplier_id)
    }

    /// Case-insensitive substring predicates.
    pub fn matches_text(&self, product: &Product) -> bool {
        let contains = |needle: &Option<String>, haystack: &str| {
            needle.as_deref().map_or(true, |needle| contains_ignore_case(haystack, needle))
        };

        let free_text = self.text.as_deref().map_or(true, |text| {
            contains_ignore_case(&product.name, text)
                || contains_ignore_case(&product.brand, text)
                || contains_ignore_case(&product.description, text)
        });

        free_text
            && contains(&self.category, &product.category)
            && contains(&self.name, &product.name)
            && contains(&self.brand, &product.brand)
    }
}
