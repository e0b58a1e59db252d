//! Order checkout and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{Money, OrderId};
use domain::{Order, OrderCharges, OrderStatus};
use engine::CheckoutRequest;
use serde::Deserialize;
use store::CommerceStore;

use crate::error::ApiError;
use crate::routes::AppState;
use crate::routes::carts::parse_customer_id;

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    #[serde(default)]
    pub shipping_cents: i64,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub currency: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ShipRequest {
    pub tracking_number: String,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: String,
    pub note: Option<String>,
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

/// POST /orders — checkout: the customer's open cart becomes an order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let customer_id = parse_customer_id(&req.customer_id)?;
    let order = state
        .orders
        .create_from_cart(
            customer_id,
            CheckoutRequest {
                charges: OrderCharges {
                    shipping: Money::from_cents(req.shipping_cents),
                    tax: Money::from_cents(req.tax_cents),
                    discount: Money::from_cents(req.discount_cents),
                },
                currency: req.currency.unwrap_or_else(|| "EUR".to_string()),
                note: req.note,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders?customer_id=…|status=… — list orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    if let Some(ref customer_id) = query.customer_id {
        let customer_id = parse_customer_id(customer_id)?;
        return Ok(Json(state.orders.orders_for_customer(customer_id).await?));
    }
    if let Some(ref status) = query.status {
        let status: OrderStatus = status
            .parse()
            .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
        return Ok(Json(state.orders.orders_with_status(status).await?));
    }
    Err(ApiError::BadRequest(
        "provide customer_id or status".to_string(),
    ))
}

/// GET /orders/:id — load an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// POST /orders/:id/confirm — confirm a pending order.
#[tracing::instrument(skip(state))]
pub async fn confirm<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orders.confirm(order_id).await?))
}

/// POST /orders/:id/ship — ship with a tracking number.
#[tracing::instrument(skip(state, req))]
pub async fn ship<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ShipRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orders.ship(order_id, req.tracking_number).await?))
}

/// POST /orders/:id/deliver — mark a shipped order delivered.
#[tracing::instrument(skip(state))]
pub async fn deliver<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orders.deliver(order_id).await?))
}

/// POST /orders/:id/cancel — customer cancellation (pending only).
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.orders.cancel(order_id, req.reason).await?))
}

/// POST /orders/:id/status — operational transition along any legal edge.
#[tracing::instrument(skip(state, req))]
pub async fn transition<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let target: OrderStatus = req
        .status
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok(Json(state.orders.transition(order_id, target, req.note).await?))
}

/// GET /orders/:id/payments — payment attempts for an order.
#[tracing::instrument(skip(state))]
pub async fn payments<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<domain::Payment>>, ApiError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.payments.payments_for_order(order_id).await?))
}
