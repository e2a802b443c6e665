use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sourcely_core::domain::product::{Product, ProductFilter, ProductId};
use sourcely_db::repositories::ProductRepository;

use super::{
    decode_input, repository_failure, Tool, ToolError, GET_PRODUCT_DETAILS, SEARCH_PRODUCTS,
};
use crate::envelope;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchProductsInput {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: ProductFilter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductIdInput {
    pub product_id: ProductId,
}

pub(crate) fn product_json(product: &Product) -> Value {
    json!({
        "id": product.id,
        "name": product.name,
        "brand": product.brand,
        "price": product.price,
        "category": product.category,
        "description": product.description,
        "supplier_id": product.supplier_id,
    })
}

pub struct SearchProducts {
    products: Arc<dyn ProductRepository>,
}

impl SearchProducts {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub async fn run(&self, input: SearchProductsInput) -> Result<Value, ToolError> {
        let mut filter = input.filters;
        let query = input.query.trim();
        if !query.is_empty() {
            filter.text = Some(query.to_string());
        }

        let products =
            self.products.search(&filter).await.map_err(repository_failure(SEARCH_PRODUCTS))?;

        Ok(json!({
            "products": products.iter().map(product_json).collect::<Vec<_>>(),
            "count": products.len(),
        }))
    }
}

#[async_trait]
impl Tool for SearchProducts {
    fn name(&self) -> &'static str {
        SEARCH_PRODUCTS
    }

    fn description(&self) -> &'static str {
        "Search products. Filters combine with AND; category, name and brand are case-insensitive \
         substrings, id, description and price match exactly and price bounds are inclusive. \
         No filters returns the whole catalog."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "free text over name, brand and description"},
                "filters": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "integer"},
                        "category": {"type": "string"},
                        "name": {"type": "string"},
                        "brand": {"type": "string"},
                        "description": {"type": "string"},
                        "price": {"type": "number", "minimum": 0},
                        "min_price": {"type": "number", "minimum": 0},
                        "max_price": {"type": "number", "minimum": 0},
                        "supplier_id": {"type": "integer"},
                        "sort": {"type": "string", "enum": ["price_asc", "price_desc"]}
                    },
                    "additionalProperties": false
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        self.run(decode_input(SEARCH_PRODUCTS, input)?).await
    }
}

pub struct GetProductDetails {
    products: Arc<dyn ProductRepository>,
}

impl GetProductDetails {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub async fn run(&self, input: ProductIdInput) -> Result<Value, ToolError> {
        let product = self
            .products
            .find_by_id(input.product_id)
            .await
            .map_err(repository_failure(GET_PRODUCT_DETAILS))?;

        Ok(match product {
            Some(product) => product_json(&product),
            None => envelope::error(format!("Product with ID {} not found", input.product_id)),
        })
    }
}

#[async_trait]
impl Tool for GetProductDetails {
    fn name(&self) -> &'static str {
        GET_PRODUCT_DETAILS
    }

    fn description(&self) -> &'static str {
        "Full record of one product by id."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"product_id": {"type": "integer"}},
            "required": ["product_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        self.run(decode_input(GET_PRODUCT_DETAILS, input)?).await
    }
}
