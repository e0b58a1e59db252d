//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::CustomerId;
use domain::Cart;
use serde::Deserialize;
use store::CommerceStore;

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

pub(crate) fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
    Ok(CustomerId::from_uuid(uuid))
}

/// GET /carts/:customer_id — the customer's open cart (created if absent).
#[tracing::instrument(skip(state))]
pub async fn get<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let cart = state.carts.get_or_create(customer_id).await?;
    Ok(Json(cart))
}

/// POST /carts/:customer_id/items — add quantity of a product.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let cart = state
        .carts
        .add_item(customer_id, req.product_id.into(), req.quantity)
        .await?;
    Ok(Json(cart))
}

/// PUT /carts/:customer_id/items/:product_id — set a line's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn set_item_quantity<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((customer_id, product_id)): Path<(String, String)>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<Json<Cart>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let cart = state
        .carts
        .set_item_quantity(customer_id, product_id.into(), req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /carts/:customer_id/items/:product_id — remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((customer_id, product_id)): Path<(String, String)>,
) -> Result<Json<Cart>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let cart = state
        .carts
        .remove_item(customer_id, product_id.into())
        .await?;
    Ok(Json(cart))
}

/// DELETE /carts/:customer_id/items — empty the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let cart = state.carts.clear(customer_id).await?;
    Ok(Json(cart))
}
