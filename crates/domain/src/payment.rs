//! Payment records, status machine and reconciliation decision.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId};
use serde::{Deserialize, Serialize};

/// The status of a payment attempt, mirroring the provider's intent
/// lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 8] = [
        PaymentStatus::RequiresPaymentMethod,
        PaymentStatus::RequiresConfirmation,
        PaymentStatus::RequiresAction,
        PaymentStatus::Processing,
        PaymentStatus::Succeeded,
        PaymentStatus::Canceled,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    /// Maps the provider's status vocabulary onto the local enum.
    ///
    /// Unrecognized statuses map to `Failed`, never silently dropped.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "requires_payment_method" => PaymentStatus::RequiresPaymentMethod,
            "requires_confirmation" => PaymentStatus::RequiresConfirmation,
            "requires_action" => PaymentStatus::RequiresAction,
            "processing" => PaymentStatus::Processing,
            "succeeded" => PaymentStatus::Succeeded,
            "canceled" => PaymentStatus::Canceled,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Failed,
        }
    }

    /// Returns true if the payment attempt can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded
                | PaymentStatus::Canceled
                | PaymentStatus::Failed
                | PaymentStatus::Refunded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::RequiresPaymentMethod => "requires_payment_method",
            PaymentStatus::RequiresConfirmation => "requires_confirmation",
            PaymentStatus::RequiresAction => "requires_action",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = crate::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::ParseStatusError(s.to_string()))
    }
}

/// The decision for applying an incoming provider status to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Write the new status.
    Apply,
    /// Same status again; a replayed notification, nothing to do.
    Replay,
    /// The payment is terminal and the notification would regress it;
    /// treat as stale and ignore.
    Stale,
}

/// Decides how an incoming provider status applies to the current one.
///
/// Replays of the same notification are no-ops; a terminal payment is
/// never regressed by an out-of-order notification.
pub fn reconcile_action(current: PaymentStatus, incoming: PaymentStatus) -> ReconcileAction {
    if incoming == current {
        ReconcileAction::Replay
    } else if current.is_terminal() {
        ReconcileAction::Stale
    } else {
        ReconcileAction::Apply
    }
}

/// One payment attempt against an order.
///
/// `provider_intent_id` is globally unique and serves as the idempotency
/// key for reconciliation. An order may accumulate several attempts;
/// exactly one may reach `Succeeded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub provider: String,
    pub status: PaymentStatus,
    pub amount: Money,
    pub currency: String,
    pub provider_intent_id: String,
    pub provider_payment_method_id: Option<String>,
    pub receipt_url: Option<String>,
    /// Opaque provider payload, stored for audit/debug only.
    pub raw_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new attempt in `RequiresPaymentMethod`.
    pub fn new(
        order_id: OrderId,
        provider: impl Into<String>,
        amount: Money,
        currency: impl Into<String>,
        provider_intent_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            order_id,
            provider: provider.into(),
            status: PaymentStatus::RequiresPaymentMethod,
            amount,
            currency: currency.into(),
            provider_intent_id: provider_intent_id.into(),
            provider_payment_method_id: None,
            receipt_url: None,
            raw_payload: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_mapping() {
        assert_eq!(
            PaymentStatus::from_provider("requires_payment_method"),
            PaymentStatus::RequiresPaymentMethod
        );
        assert_eq!(
            PaymentStatus::from_provider("processing"),
            PaymentStatus::Processing
        );
        assert_eq!(
            PaymentStatus::from_provider("succeeded"),
            PaymentStatus::Succeeded
        );
        assert_eq!(
            PaymentStatus::from_provider("refunded"),
            PaymentStatus::Refunded
        );
    }

    #[test]
    fn unknown_provider_status_maps_to_failed() {
        assert_eq!(
            PaymentStatus::from_provider("some_new_status"),
            PaymentStatus::Failed
        );
        assert_eq!(PaymentStatus::from_provider(""), PaymentStatus::Failed);
    }

    #[test]
    fn terminal_statuses() {
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Canceled.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(!PaymentStatus::Processing.is_terminal());
        assert!(!PaymentStatus::RequiresPaymentMethod.is_terminal());
    }

    #[test]
    fn replayed_notification_is_noop() {
        assert_eq!(
            reconcile_action(PaymentStatus::Succeeded, PaymentStatus::Succeeded),
            ReconcileAction::Replay
        );
        assert_eq!(
            reconcile_action(PaymentStatus::Processing, PaymentStatus::Processing),
            ReconcileAction::Replay
        );
    }

    #[test]
    fn terminal_payment_ignores_stale_updates() {
        assert_eq!(
            reconcile_action(PaymentStatus::Succeeded, PaymentStatus::Processing),
            ReconcileAction::Stale
        );
        assert_eq!(
            reconcile_action(PaymentStatus::Failed, PaymentStatus::RequiresAction),
            ReconcileAction::Stale
        );
    }

    #[test]
    fn non_terminal_payment_applies_updates() {
        assert_eq!(
            reconcile_action(PaymentStatus::Processing, PaymentStatus::Succeeded),
            ReconcileAction::Apply
        );
        assert_eq!(
            reconcile_action(PaymentStatus::RequiresPaymentMethod, PaymentStatus::Failed),
            ReconcileAction::Apply
        );
    }

    #[test]
    fn new_payment_defaults() {
        let payment = Payment::new(
            OrderId::new(),
            "stripe",
            Money::from_cents(2000),
            "EUR",
            "pi_123",
        );
        assert_eq!(payment.status, PaymentStatus::RequiresPaymentMethod);
        assert_eq!(payment.provider_intent_id, "pi_123");
        assert!(payment.raw_payload.is_none());
    }

    #[test]
    fn parse_roundtrip() {
        for status in PaymentStatus::ALL {
            let parsed: PaymentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
