//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Confirmed ──┬──► Shipped ──► Delivered
///           │        │       │
///           ├────────┼───────┴──◄── Paid ──► Refunded
///           │        │
///           └────────┴──► Cancelled
/// ```
/// `Pending` may also move straight to `Paid` (gateway notification before
/// manual confirmation) or to `Failed`. `Completed`, `Cancelled`,
/// `Delivered`, `Failed` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Paid,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Failed,
    Refunded,
}

impl OrderStatus {
    /// All statuses, for exhaustive edge sweeps.
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Failed,
        OrderStatus::Refunded,
    ];

    /// The allowed-edge table: statuses reachable from this one.
    ///
    /// `Completed` carries no inbound edge; it exists in the stored
    /// vocabulary but the engine never produces it.
    pub fn next_states(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[
                OrderStatus::Confirmed,
                OrderStatus::Paid,
                OrderStatus::Cancelled,
                OrderStatus::Failed,
            ],
            OrderStatus::Confirmed => &[
                OrderStatus::Paid,
                OrderStatus::Shipped,
                OrderStatus::Cancelled,
            ],
            OrderStatus::Paid => &[OrderStatus::Shipped, OrderStatus::Refunded],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered
            | OrderStatus::Completed
            | OrderStatus::Cancelled
            | OrderStatus::Failed
            | OrderStatus::Refunded => &[],
        }
    }

    /// Returns true if the edge from this status to `target` is legal.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.next_states().contains(&target)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// Returns true if a successful payment may still move the order to
    /// `Paid` from this status.
    pub fn is_payable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = crate::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| crate::ParseStatusError(s.to_string()))
    }
}
