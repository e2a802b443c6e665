//! Product and supplier CRUD routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use sourcely_core::domain::product::{NewProduct, Product, ProductId};
use sourcely_core::domain::supplier::{NewSupplier, Supplier, SupplierId};
use sourcely_db::repositories::Page;

use crate::api::{ApiError, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product).put(update_product).delete(delete_product))
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/{id}", get(get_supplier))
        .with_state(state)
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    skip: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    Page::default().limit
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page::new(query.skip, query.limit)
    }
}

async fn ensure_supplier_exists(
    state: &AppState,
    supplier_id: SupplierId,
) -> Result<(), ApiError> {
    match state.suppliers.find_by_id(supplier_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::bad_request(format!("supplier `{supplier_id}` does not exist"))),
    }
}

async fn create_product(
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<Json<Product>, ApiError> {
    product.validate()?;
    ensure_supplier_exists(&state, product.supplier_id).await?;

    let product = state.products.create(product).await?;
    info!(
        event_name = "catalog.product.created",
        product_id = product.id.0,
        supplier_id = product.supplier_id.0,
        "product created"
    );
    Ok(Json(product))
}

async fn list_products(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.products.list(page.into()).await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    state
        .products
        .find_by_id(ProductId(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("product", id))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(product): Json<NewProduct>,
) -> Result<Json<Product>, ApiError> {
    product.validate()?;
    ensure_supplier_exists(&state, product.supplier_id).await?;

    let updated = state
        .products
        .update(ProductId(id), product)
        .await?
        .ok_or_else(|| ApiError::not_found("product", id))?;
    info!(event_name = "catalog.product.updated", product_id = id, "product updated");
    Ok(Json(updated))
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.products.delete(ProductId(id)).await? {
        return Err(ApiError::not_found("product", id));
    }
    info!(event_name = "catalog.product.deleted", product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn create_supplier(
    State(state): State<AppState>,
    Json(supplier): Json<NewSupplier>,
) -> Result<Json<Supplier>, ApiError> {
    supplier.validate()?;

    let supplier = state.suppliers.create(supplier).await?;
    info!(event_name = "catalog.supplier.created", supplier_id = supplier.id.0, "supplier created");
    Ok(Json(supplier))
}

async fn list_suppliers(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    Ok(Json(state.suppliers.list(page.into()).await?))
}

async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Supplier>, ApiError> {
    state
        .suppliers
        .find_by_id(SupplierId(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("supplier", id))
}
