//! Payment reconciler: the provider boundary and its idempotency rules.

use std::collections::HashMap;

use common::{CustomerId, OrderId};
use domain::{Payment, PaymentStatus};
use metrics::counter;
use store::{CommerceStore, PaymentPatch, ReconcileOutcome};

use crate::error::{EngineError, Result};
use crate::gateway::{CreateIntentRequest, PaymentGateway};

/// Reconciles payment provider state with local payments and orders.
///
/// Every provider notification funnels through [`reconcile`], keyed by
/// the provider intent id: replays are no-ops, terminal payments are
/// never regressed, and a success on a payable order moves it to `Paid`
/// in the same store commit.
///
/// [`reconcile`]: PaymentReconciler::reconcile
pub struct PaymentReconciler<S: CommerceStore, G: PaymentGateway> {
    store: S,
    gateway: G,
}

impl<S: CommerceStore, G: PaymentGateway> PaymentReconciler<S, G> {
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Opens a payment intent for an order and records the attempt.
    #[tracing::instrument(skip(self))]
    pub async fn create_intent(
        &self,
        order_id: OrderId,
        description: Option<String>,
    ) -> Result<Payment> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;
        if !order.status.is_payable() {
            return Err(EngineError::OrderNotPayable {
                status: order.status,
            });
        }

        let handle = self
            .gateway
            .create_intent(CreateIntentRequest {
                amount_minor: order.total.cents(),
                currency: order.currency.clone(),
                description,
                metadata: HashMap::from([("order_id".to_string(), order.id.to_string())]),
            })
            .await?;

        let mut payment = Payment::new(
            order.id,
            self.gateway.provider(),
            order.total,
            order.currency.clone(),
            handle.intent_id,
        );
        payment.status = PaymentStatus::from_provider(&handle.status);

        self.store.insert_payment(&payment).await?;
        counter!("payment_intents_created_total").increment(1);
        Ok(payment)
    }

    /// Confirms an intent with the provider and reconciles the result.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        intent_id: &str,
        payment_method_id: Option<&str>,
    ) -> Result<Option<Payment>> {
        let handle = self
            .gateway
            .confirm_intent(intent_id, payment_method_id)
            .await?;
        self.reconcile(
            intent_id,
            &handle.status,
            handle.payment_method_id.clone(),
            None,
            None,
        )
        .await
    }

    /// Pulls the provider's current view of an intent and reconciles it.
    #[tracing::instrument(skip(self))]
    pub async fn sync_status(&self, intent_id: &str) -> Result<Option<Payment>> {
        let handle = self.gateway.intent_status(intent_id).await?;
        self.reconcile(
            intent_id,
            &handle.status,
            handle.payment_method_id.clone(),
            None,
            None,
        )
        .await
    }

    /// Applies a provider status notification to the local payment.
    ///
    /// Returns `Ok(None)` for an unknown intent id: notifications can
    /// arrive for intents created out-of-band, and dropping them with a
    /// warning keeps the webhook endpoint acknowledging.
    #[tracing::instrument(skip(self, raw_payload))]
    pub async fn reconcile(
        &self,
        intent_id: &str,
        provider_status: &str,
        payment_method_id: Option<String>,
        receipt_url: Option<String>,
        raw_payload: Option<serde_json::Value>,
    ) -> Result<Option<Payment>> {
        let status = PaymentStatus::from_provider(provider_status);
        let patch = PaymentPatch {
            status,
            payment_method_id,
            receipt_url,
            raw_payload,
        };

        match self.store.apply_payment_update(intent_id, patch).await? {
            ReconcileOutcome::Applied { payment, order } => {
                counter!("payments_reconciled_total", "status" => status.as_str()).increment(1);
                if let Some(order) = order {
                    tracing::info!(
                        order_id = %order.id,
                        intent_id,
                        "payment succeeded, order marked paid"
                    );
                }
                Ok(Some(payment))
            }
            ReconcileOutcome::Replayed { payment } => {
                tracing::debug!(intent_id, "replayed notification, no change");
                Ok(Some(payment))
            }
            ReconcileOutcome::Stale { payment } => {
                tracing::warn!(
                    intent_id,
                    current = %payment.status,
                    incoming = %status,
                    "stale notification for terminal payment, ignored"
                );
                Ok(Some(payment))
            }
            ReconcileOutcome::NotFound => {
                tracing::warn!(intent_id, "notification for unknown intent, dropped");
                Ok(None)
            }
        }
    }

    pub async fn payment_by_intent(&self, intent_id: &str) -> Result<Option<Payment>> {
        Ok(self.store.find_payment_by_intent(intent_id).await?)
    }

    /// Payments for an order, newest first.
    pub async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        Ok(self.store.payments_for_order(order_id).await?)
    }

    /// Payments across all of a customer's orders, newest first.
    pub async fn payments_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Payment>> {
        Ok(self.store.payments_for_customer(customer_id).await?)
    }
}
