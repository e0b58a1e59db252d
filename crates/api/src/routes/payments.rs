//! Payment intent and reconciliation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::Payment;
use serde::{Deserialize, Serialize};
use store::CommerceStore;

use crate::error::ApiError;
use crate::routes::AppState;
use crate::routes::carts::parse_customer_id;

#[derive(Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ConfirmRequest {
    pub payment_method_id: Option<String>,
}

#[derive(Deserialize)]
pub struct WebhookRequest {
    pub intent_id: String,
    pub status: String,
    pub payment_method_id: Option<String>,
    pub receipt_url: Option<String>,
    pub payload: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    /// False when the intent is unknown and the notification was dropped.
    pub applied: bool,
    pub payment: Option<Payment>,
}

/// POST /payments/intents — open a payment intent for an order.
#[tracing::instrument(skip(state, req))]
pub async fn create_intent<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let uuid = uuid::Uuid::parse_str(&req.order_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    let payment = state
        .payments
        .create_intent(OrderId::from_uuid(uuid), req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// POST /payments/:intent_id/confirm — confirm with the provider.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(intent_id): Path<String>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .confirm(&intent_id, req.payment_method_id.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment intent {intent_id} not found")))?;
    Ok(Json(payment))
}

/// POST /payments/:intent_id/sync — pull the provider's current status.
#[tracing::instrument(skip(state))]
pub async fn sync<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(intent_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .sync_status(&intent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment intent {intent_id} not found")))?;
    Ok(Json(payment))
}

/// GET /payments/:intent_id — the local payment record for an intent.
#[tracing::instrument(skip(state))]
pub async fn get<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(intent_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .payment_by_intent(&intent_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payment intent {intent_id} not found")))?;
    Ok(Json(payment))
}

/// POST /payments/webhook — provider status notification.
///
/// Always acknowledges with 200 so the provider stops retrying; unknown
/// intents are reported as not applied.
#[tracing::instrument(skip(state, req))]
pub async fn webhook<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let payment = state
        .payments
        .reconcile(
            &req.intent_id,
            &req.status,
            req.payment_method_id,
            req.receipt_url,
            req.payload,
        )
        .await?;
    Ok(Json(WebhookResponse {
        applied: payment.is_some(),
        payment,
    }))
}

/// GET /customers/:customer_id/payments — all payment attempts across a
/// customer's orders.
#[tracing::instrument(skip(state))]
pub async fn for_customer<S: CommerceStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    Ok(Json(state.payments.payments_for_customer(customer_id).await?))
}
