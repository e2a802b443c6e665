use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use sourcely_db::repositories::{ProductRepository, RepositoryError, SupplierRepository};

use crate::envelope;

pub mod product;
pub mod supplier;

pub use product::{GetProductDetails, ProductIdInput, SearchProducts, SearchProductsInput};
pub use supplier::{
    GetSupplierDetails, GetSupplierProducts, SearchSuppliers, SearchSuppliersInput,
    SupplierFilters, SupplierIdInput, SupplierProductsInput,
};

pub const SEARCH_PRODUCTS: &str = "search_products";
pub const GET_PRODUCT_DETAILS: &str = "get_product_details";
pub const SEARCH_SUPPLIERS: &str = "search_suppliers";
pub const GET_SUPPLIER_DETAILS: &str = "get_supplier_details";
pub const GET_SUPPLIER_PRODUCTS: &str = "get_supplier_products";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid input for `{tool}`: {message}")]
    InvalidInput { tool: &'static str, message: String },
    #[error("`{tool}` failed: {source}")]
    Repository {
        tool: &'static str,
        #[source]
        source: RepositoryError,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn parameters(&self) -> Value;

    async fn execute(&self, input: Value) -> Result<Value, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: self.description(),
            parameters: self.parameters(),
        }
    }
}

/// Decodes a tool's JSON input; a `null` input is treated as `{}`.
pub(crate) fn decode_input<T: DeserializeOwned>(
    tool: &'static str,
    input: Value,
) -> Result<T, ToolError> {
    let input = if input.is_null() { Value::Object(Default::default()) } else { input };
    serde_json::from_value(input)
        .map_err(|e| ToolError::InvalidInput { tool, message: e.to_string() })
}

pub(crate) fn repository_failure(tool: &'static str) -> impl FnOnce(RepositoryError) -> ToolError {
    move |source| ToolError::Repository { tool, source }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn catalog(
        products: Arc<dyn ProductRepository>,
        suppliers: Arc<dyn SupplierRepository>,
    ) -> Self {
        let mut registry = Self::default();
        registry.register(SearchProducts::new(products.clone()));
        registry.register(GetProductDetails::new(products.clone()));
        registry.register(SearchSuppliers::new(suppliers.clone()));
        registry.register(GetSupplierDetails::new(suppliers.clone(), products.clone()));
        registry.register(GetSupplierProducts::new(suppliers, products));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub async fn invoke(&self, name: &str, input: Value) -> Value {
        match self.try_invoke(name, input).await {
            Ok(envelope) => envelope,
            Err(error @ (ToolError::UnknownTool(_) | ToolError::InvalidInput { .. })) => {
                tracing::warn!(
                    event_name = "agent.tool.rejected",
                    tool = name,
                    error = %error,
                    "tool call rejected"
                );
                envelope::error(error.to_string())
            }
            Err(error) => {
                tracing::error!(
                    event_name = "agent.tool.failed",
                    tool = name,
                    error = %error,
                    "tool execution failed"
                );
                envelope::error(envelope::CATALOG_UNAVAILABLE)
            }
        }
    }

    async fn try_invoke(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tracing::debug!(event_name = "agent.tool.invoked", tool = name, "invoking tool");
        tool.execute(input).await
    }
}
