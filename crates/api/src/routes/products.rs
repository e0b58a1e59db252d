//! Catalog seeding and read endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::Money;
use domain::Product;
use serde::Deserialize;
use store::CommerceStore;

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Deserialize)]
pub struct UpsertProductRequest {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub unit_price_cents: i64,
    pub stock_qty: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// PUT /products — create or replace a catalog product.
#[tracing::instrument(skip(state, req))]
pub async fn upsert<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<UpsertProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = Product {
        id: req.id.into(),
        name: req.name,
        sku: req.sku,
        unit_price: Money::from_cents(req.unit_price_cents),
        stock_qty: req.stock_qty,
        is_active: req.is_active,
    };
    state
        .store
        .upsert_product(&product)
        .await
        .map_err(engine::EngineError::from)?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products — list the catalog.
pub async fn list<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state
        .store
        .list_products()
        .await
        .map_err(engine::EngineError::from)?;
    Ok(Json(products))
}

/// GET /products/:id — load one product.
pub async fn get<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .store
        .get_product(&id.as_str().into())
        .await
        .map_err(engine::EngineError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(product))
}
