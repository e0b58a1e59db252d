//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the payment provider boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("intent not found: {0}")]
    IntentNotFound(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// Request to open a payment intent with the provider.
#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    /// Amount in the currency's minor unit (cents).
    pub amount_minor: i64,
    pub currency: String,
    pub description: Option<String>,
    /// Free-form key/value pairs echoed back by the provider.
    pub metadata: HashMap<String, String>,
}

/// Provider-side view of a payment intent.
///
/// `status` is the provider's own vocabulary; the reconciler maps it
/// onto [`domain::PaymentStatus`].
#[derive(Debug, Clone)]
pub struct IntentHandle {
    pub intent_id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub payment_method_id: Option<String>,
}

/// Trait for payment provider operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The provider label recorded on payments ("stripe", "memory").
    fn provider(&self) -> &str;

    /// Opens a new payment intent.
    async fn create_intent(&self, request: CreateIntentRequest)
    -> Result<IntentHandle, GatewayError>;

    /// Confirms an intent, optionally attaching a payment method.
    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_id: Option<&str>,
    ) -> Result<IntentHandle, GatewayError>;

    /// Fetches the provider's current view of an intent.
    async fn intent_status(&self, intent_id: &str) -> Result<IntentHandle, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, IntentHandle>,
    next_id: u32,
    fail_on_create: bool,
    decline_on_confirm: bool,
}

/// In-memory payment gateway for testing.
///
/// Intents are assigned sequential `pi_NNNN` ids. Confirmation succeeds
/// by default; the knobs simulate provider failures and declines.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to error on intent creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Configures the gateway to decline confirmations (intent moves to
    /// `requires_payment_method`, matching a card decline).
    pub fn set_decline_on_confirm(&self, decline: bool) {
        self.state.write().unwrap().decline_on_confirm = decline;
    }

    /// Forces an intent into a given provider status, simulating an
    /// out-of-band change a webhook would later report.
    pub fn force_intent_status(&self, intent_id: &str, status: &str) {
        let mut state = self.state.write().unwrap();
        if let Some(handle) = state.intents.get_mut(intent_id) {
            handle.status = status.to_string();
        }
    }

    /// Returns the number of open intents.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    fn provider(&self) -> &str {
        "memory"
    }

    async fn create_intent(
        &self,
        request: CreateIntentRequest,
    ) -> Result<IntentHandle, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Provider("intent creation failed".to_string()));
        }
        if request.amount_minor <= 0 {
            return Err(GatewayError::Provider(format!(
                "invalid amount: {}",
                request.amount_minor
            )));
        }

        state.next_id += 1;
        let intent_id = format!("pi_{:04}", state.next_id);
        let handle = IntentHandle {
            intent_id: intent_id.clone(),
            client_secret: Some(format!("{intent_id}_secret")),
            status: "requires_payment_method".to_string(),
            payment_method_id: None,
        };
        state.intents.insert(intent_id, handle.clone());
        Ok(handle)
    }

    async fn confirm_intent(
        &self,
        intent_id: &str,
        payment_method_id: Option<&str>,
    ) -> Result<IntentHandle, GatewayError> {
        let mut state = self.state.write().unwrap();
        let declined = state.decline_on_confirm;
        let handle = state
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| GatewayError::IntentNotFound(intent_id.to_string()))?;

        if let Some(method) = payment_method_id {
            handle.payment_method_id = Some(method.to_string());
        }
        handle.status = if declined {
            "requires_payment_method".to_string()
        } else {
            "succeeded".to_string()
        };
        Ok(handle.clone())
    }

    async fn intent_status(&self, intent_id: &str) -> Result<IntentHandle, GatewayError> {
        let state = self.state.read().unwrap();
        state
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::IntentNotFound(intent_id.to_string()))
    }
}
