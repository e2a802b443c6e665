use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sourcely_core::domain::product::{ProductFilter, ProductSort};
use sourcely_core::domain::supplier::{Supplier, SupplierId, SupplierSearch};
use sourcely_db::repositories::{ProductRepository, SupplierRepository};

use super::{
    decode_input, repository_failure, Tool, ToolError, GET_SUPPLIER_DETAILS,
    GET_SUPPLIER_PRODUCTS, SEARCH_SUPPLIERS,
};
use crate::envelope;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSuppliersInput {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filters: SupplierFilters,
}

impl SearchSuppliersInput {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            query: String::new(),
            filters: SupplierFilters { category: None, name: Some(name.into()) },
        }
    }

    fn into_search(self) -> SupplierSearch {
        let non_blank = |value: Option<String>| {
            value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        SupplierSearch {
            text: non_blank(Some(self.query)),
            category: non_blank(self.filters.category),
            name: non_blank(self.filters.name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierIdInput {
    pub supplier_id: SupplierId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierProductsInput {
    pub supplier_id: SupplierId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<ProductSort>,
}

pub(crate) fn supplier_json(supplier: &Supplier) -> Value {
    json!({
        "id": supplier.id,
        "name": supplier.name,
        "email": supplier.email,
        "phone": supplier.phone,
        "address": supplier.address,
        "categories_offered": supplier.categories_offered,
    })
}

pub struct SearchSuppliers {
    suppliers: Arc<dyn SupplierRepository>,
}

impl SearchSuppliers {
    pub fn new(suppliers: Arc<dyn SupplierRepository>) -> Self {
        Self { suppliers }
    }

    pub async fn run(&self, input: SearchSuppliersInput) -> Result<Value, ToolError> {
        let search = input.into_search();
        let suppliers =
            self.suppliers.search(&search).await.map_err(repository_failure(SEARCH_SUPPLIERS))?;

        if suppliers.is_empty() {
            return Ok(json!({
                "suppliers": [],
                "count": 0,
                "message": envelope::NO_SUPPLIERS,
            }));
        }

        Ok(json!({
            "suppliers": suppliers.iter().map(supplier_json).collect::<Vec<_>>(),
            "count": suppliers.len(),
        }))
    }
}

#[async_trait]
impl Tool for SearchSuppliers {
    fn name(&self) -> &'static str {
        SEARCH_SUPPLIERS
    }

    fn description(&self) -> &'static str {
        "Search suppliers in ascending id order. `filters.category` must be one of the supplier's \
         offered categories and `filters.name` is a substring; without filters, `query` matches \
         name, email or address."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "filters": {
                    "type": "object",
                    "properties": {
                        "category": {"type": "string"},
                        "name": {"type": "string"}
                    },
                    "additionalProperties": false
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        self.run(decode_input(SEARCH_SUPPLIERS, input)?).await
    }
}

pub struct GetSupplierDetails {
    suppliers: Arc<dyn SupplierRepository>,
    products: Arc<dyn ProductRepository>,
}

impl GetSupplierDetails {
    pub fn new(
        suppliers: Arc<dyn SupplierRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self { suppliers, products }
    }

    pub async fn run(&self, input: SupplierIdInput) -> Result<Value, ToolError> {
        let failure = repository_failure(GET_SUPPLIER_DETAILS);
        let Some(supplier) = self.suppliers.find_by_id(input.supplier_id).await.map_err(failure)?
        else {
            return Ok(envelope::error("Supplier not found"));
        };

        let products_count = self
            .products
            .count_by_supplier(supplier.id)
            .await
            .map_err(repository_failure(GET_SUPPLIER_DETAILS))?;

        let mut record = supplier_json(&supplier);
        record["products_count"] = json!(products_count);
        Ok(json!({ "supplier": record }))
    }
}

#[async_trait]
impl Tool for GetSupplierDetails {
    fn name(&self) -> &'static str {
        GET_SUPPLIER_DETAILS
    }

    fn description(&self) -> &'static str {
        "Full record of one supplier by id, with the number of products it owns."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"supplier_id": {"type": "integer"}},
            "required": ["supplier_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        self.run(decode_input(GET_SUPPLIER_DETAILS, input)?).await
    }
}

pub struct GetSupplierProducts {
    suppliers: Arc<dyn SupplierRepository>,
    products: Arc<dyn ProductRepository>,
}

impl GetSupplierProducts {
    pub fn new(
        suppliers: Arc<dyn SupplierRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self { suppliers, products }
    }

    pub async fn run(&self, input: SupplierProductsInput) -> Result<Value, ToolError> {
        let failure = repository_failure(GET_SUPPLIER_PRODUCTS);
        let Some(supplier) = self.suppliers.find_by_id(input.supplier_id).await.map_err(failure)?
        else {
            return Ok(envelope::error(format!(
                "Supplier with ID {} not found",
                input.supplier_id
            )));
        };

        let filter = ProductFilter {
            supplier_id: Some(supplier.id),
            sort: input.sort,
            ..ProductFilter::default()
        };
        let products = self
            .products
            .search(&filter)
            .await
            .map_err(repository_failure(GET_SUPPLIER_PRODUCTS))?;

        let listed: Vec<Value> = products
            .iter()
            .map(|product| {
                json!({
                    "id": product.id,
                    "name": product.name,
                    "brand": product.brand,
                    "price": product.price,
                    "category": product.category,
                    "description": product.description,
                })
            })
            .collect();

        Ok(json!({
            "supplier": {"id": supplier.id, "name": supplier.name},
            "products": listed,
            "count": products.len(),
        }))
    }
}

#[async_trait]
impl Tool for GetSupplierProducts {
    fn name(&self) -> &'static str {
        GET_SUPPLIER_PRODUCTS
    }

    fn description(&self) -> &'static str {
        "Every product of one supplier, optionally ordered by price."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "supplier_id": {"type": "integer"},
                "sort": {"type": "string", "enum": ["price_asc", "price_desc"]}
            },
            "required": ["supplier_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        self.run(decode_input(GET_SUPPLIER_PRODUCTS, input)?).await
    }
}
