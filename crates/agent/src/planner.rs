use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use sourcely_core::domain::eq_ignore_case;
use sourcely_core::domain::product::{ProductFilter, ProductSort};
use sourcely_core::domain::supplier::SupplierId;

use crate::classifier::{Entities, Intent, QueryType};
use crate::envelope;
use crate::tools::{
    SearchProductsInput, SearchSuppliersInput, SupplierFilters, SupplierIdInput,
    SupplierProductsInput, ToolRegistry, GET_SUPPLIER_DETAILS, GET_SUPPLIER_PRODUCTS,
    SEARCH_PRODUCTS, SEARCH_SUPPLIERS,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    SearchProducts(SearchProductsInput),
    SearchSuppliers(SearchSuppliersInput),
    SupplierDetails { supplier_name: String },
    SupplierProducts { supplier_name: String, sort: Option<ProductSort> },
    NoTool,
}

pub fn plan_for(intent: &Intent) -> Plan {
    let entities = &intent.entities;
    match intent.query_type {
        QueryType::ProductSearch => Plan::SearchProducts(SearchProductsInput {
            query: String::new(),
            filters: product_filters(entities),
        }),
        QueryType::SupplierSearch => Plan::SearchSuppliers(SearchSuppliersInput {
            query: String::new(),
            filters: SupplierFilters {
                category: entities.category.clone(),
                name: entities.name.clone(),
            },
        }),
        QueryType::SupplierDetails => match &entities.supplier_name {
            Some(supplier_name) => Plan::SupplierDetails { supplier_name: supplier_name.clone() },
            None => Plan::NoTool,
        },
        QueryType::SupplierProducts => match &entities.supplier_name {
            Some(supplier_name) => Plan::SupplierProducts {
                supplier_name: supplier_name.clone(),
                sort: entities.sort,
            },
            None => Plan::NoTool,
        },
        // No extracted entity carries a product id.
        QueryType::ProductDetails => Plan::NoTool,
    }
}

pub fn product_filters(entities: &Entities) -> ProductFilter {
    ProductFilter {
        category: entities.category.clone(),
        name: entities.product_type.clone(),
        brand: entities.brand.clone(),
        min_price: entities.min_price,
        max_price: entities.max_price,
        sort: entities.sort,
        ..ProductFilter::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierRef {
    pub id: SupplierId,
    pub name: String,
}

#[derive(Deserialize)]
struct SupplierMatches {
    #[serde(default)]
    suppliers: Vec<SupplierRef>,
}

/// Case-insensitive exact name match wins; otherwise the first (lowest id) candidate.
pub fn pick_supplier(name: &str, candidates: &[SupplierRef]) -> Option<SupplierId> {
    candidates
        .iter()
        .find(|candidate| eq_ignore_case(&candidate.name, name))
        .or_else(|| candidates.first())
        .map(|candidate| candidate.id)
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not encode tool input: {0}")]
    EncodeInput(#[source] serde_json::Error),
    #[error("unexpected `{tool}` output: {source}")]
    DecodeOutput {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub struct Dispatcher {
    tools: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    pub async fn dispatch(&self, plan: &Plan) -> Result<Option<Value>, DispatchError> {
        match plan {
            Plan::SearchProducts(input) => self.call(SEARCH_PRODUCTS, input).await.map(Some),
            Plan::SearchSuppliers(input) => self.call(SEARCH_SUPPLIERS, input).await.map(Some),
            Plan::SupplierDetails { supplier_name } => {
                let Some(supplier_id) = self.resolve_supplier(supplier_name).await? else {
                    return Ok(None);
                };
                self.call(GET_SUPPLIER_DETAILS, &SupplierIdInput { supplier_id }).await.map(Some)
            }
            Plan::SupplierProducts { supplier_name, sort } => {
                let Some(supplier_id) = self.resolve_supplier(supplier_name).await? else {
                    return Ok(None);
                };
                let input = SupplierProductsInput { supplier_id, sort: *sort };
                self.call(GET_SUPPLIER_PRODUCTS, &input).await.map(Some)
            }
            Plan::NoTool => Ok(None),
        }
    }

    async fn resolve_supplier(&self, name: &str) -> Result<Option<SupplierId>, DispatchError> {
        let envelope = self.call(SEARCH_SUPPLIERS, &SearchSuppliersInput::by_name(name)).await?;
        if envelope::is_error(&envelope) {
            tracing::warn!(
                event_name = "agent.dispatch.resolution_failed",
                supplier_name = name,
                "supplier lookup returned an error envelope"
            );
            return Ok(None);
        }

        let matches: SupplierMatches = serde_json::from_value(envelope)
            .map_err(|source| DispatchError::DecodeOutput { tool: SEARCH_SUPPLIERS, source })?;
        let resolved = pick_supplier(name, &matches.suppliers);

        tracing::debug!(
            event_name = "agent.dispatch.supplier_resolved",
            supplier_name = name,
            candidates = matches.suppliers.len(),
            supplier_id = resolved.map(|id| id.0),
            "resolved supplier name"
        );
        Ok(resolved)
    }

    async fn call<T: Serialize>(&self, tool: &str, input: &T) -> Result<Value, DispatchError> {
        let input = serde_json::to_value(input).map_err(DispatchError::EncodeInput)?;
        Ok(self.tools.invoke(tool, input).await)
    }
}
