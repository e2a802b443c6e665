use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use sourcely_core::domain::product::ProductSort;

use crate::llm::{LlmClient, LlmError};

pub const SYSTEM_PROMPT: &str = r#"You analyze questions about a product and supplier catalog.

1. Pick exactly one query_type:
   - "product_search": find products matching filters
   - "product_details": information about one specific product
   - "supplier_search": find suppliers
   - "supplier_details": information about one specific supplier
   - "supplier_products": products sold by one specific supplier

2. Extract every entity that applies (omit the others):
   - category: product category such as electronics, gaming or accessories
   - min_price: lowest acceptable price, a number
   - max_price: highest acceptable price, a number
   - brand: product brand
   - name: product or supplier name
   - sort: price_asc or price_desc
   - supplier_name: name of the supplier
   - product_type: kind of product such as laptop, keyboard or monitor

Answer with JSON only, shaped as:
{"query_type": "<type>", "entities": {"<key>": <value>}}

Example: "Find me a gaming monitor under $500"
{"query_type": "product_search", "entities": {"category": "gaming", "product_type": "monitor", "max_price": 500}}

Example: "Show me all products from TechMaster sorted by price"
{"query_type": "supplier_products", "entities": {"supplier_name": "TechMaster", "sort": "price_asc"}}
"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    ProductSearch,
    ProductDetails,
    SupplierSearch,
    SupplierDetails,
    SupplierProducts,
}

impl QueryType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "product_details" => Self::ProductDetails,
            "supplier_search" => Self::SupplierSearch,
            "supplier_details" => Self::SupplierDetails,
            "supplier_products" => Self::SupplierProducts,
            _ => Self::ProductSearch,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductSearch => "product_search",
            Self::ProductDetails => "product_details",
            Self::SupplierSearch => "supplier_search",
            Self::SupplierDetails => "supplier_details",
            Self::SupplierProducts => "supplier_products",
        }
    }
}

impl<'de> Deserialize<'de> for QueryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::parse).unwrap_or(Self::ProductSearch))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_price", skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_sort", skip_serializing_if = "Option::is_none")]
    pub sort: Option<ProductSort>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub query_type: QueryType,
    pub entities: Entities,
}

impl Intent {
    pub fn fallback() -> Self {
        Self { query_type: QueryType::ProductSearch, entities: Entities::default() }
    }
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("unparseable classification: {0}")]
    Unparseable(String),
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str) -> Result<Intent, ClassificationError>;
}

pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, utterance: &str) -> Result<Intent, ClassificationError> {
        let reply = self.llm.complete(SYSTEM_PROMPT, utterance).await?;
        parse_intent(&reply)
    }
}

pub fn parse_intent(reply: &str) -> Result<Intent, ClassificationError> {
    let candidate = first_json_object(reply)
        .ok_or_else(|| ClassificationError::Unparseable("no JSON object in reply".to_string()))?;

    serde_json::from_str(candidate).map_err(|e| ClassificationError::Unparseable(e.to_string()))
}

/// First balanced `{...}` in `text`, skipping braces inside string literals.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let price = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned: String =
                text.chars().filter(|ch| !matches!(ch, '$' | ',' | ' ')).collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    Ok(price.filter(|price| price.is_finite()))
}

fn lenient_sort<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ProductSort>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(ProductSort::parse))
}
