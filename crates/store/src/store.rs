use async_trait::async_trait;
use common::{CartId, CustomerId, OrderId, ProductId};
use domain::{Cart, Order, OrderStatus, Payment, PaymentStatus, Product};

use crate::error::Result;

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// Stock was sufficient and has been decremented.
    Applied { remaining: u32 },
    /// Stock was insufficient; nothing changed.
    Insufficient { available: u32 },
}

/// Outcome of the atomic checkout commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// All decrements succeeded; the order exists and the cart is
    /// `CheckedOut`.
    Created,
    /// A line could not be covered; no stock was taken and neither the
    /// order nor the cart changed.
    OutOfStock { product_id: ProductId, available: u32 },
    /// The cart was no longer `Open` at commit time (a racing checkout
    /// closed it first); nothing changed.
    CartNotOpen,
}

/// Outcome of an atomic order status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was legal and committed; the updated order.
    Applied(Order),
    /// The edge is not in the state machine; nothing changed.
    Rejected { current: OrderStatus },
    NotFound,
}

/// Fields a reconciliation writes onto a payment.
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub status: PaymentStatus,
    pub payment_method_id: Option<String>,
    pub receipt_url: Option<String>,
    pub raw_payload: Option<serde_json::Value>,
}

/// Outcome of an atomic payment reconciliation commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The patch was applied. `order` carries the updated order when the
    /// success also moved it to `Paid`.
    Applied {
        payment: Payment,
        order: Option<Order>,
    },
    /// Same status again; a replayed notification, nothing written.
    Replayed { payment: Payment },
    /// The payment is terminal and the patch would regress it; ignored.
    Stale { payment: Payment },
    /// No payment carries this intent id.
    NotFound,
}

/// The persistence operations the commerce engine runs on.
///
/// Composite operations (`checkout`, `transition_order`,
/// `apply_payment_update`, `get_or_create_open_cart`) are atomic: the
/// backend checks and applies under one lock or transaction, and a
/// rejection leaves no partial effects.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    // Catalog and stock ledger.

    async fn upsert_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Decrements stock only if at least `quantity` units remain.
    async fn try_decrement_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<StockAdjustment>;

    /// Returns `quantity` units to stock (restock on cancellation).
    async fn increment_stock(&self, id: &ProductId, quantity: u32) -> Result<()>;

    // Carts.

    /// Returns the customer's open cart, creating one if none exists.
    ///
    /// At most one open cart per customer; concurrent callers for the
    /// same customer observe the same cart.
    async fn get_or_create_open_cart(&self, customer_id: CustomerId) -> Result<Cart>;

    async fn find_open_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>>;

    /// Persists the cart's current state (status and lines) wholesale.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    // Orders.

    /// Atomically decrements stock for every order line, inserts the
    /// order, and marks the source cart `CheckedOut`. The cart must
    /// still be `Open` inside the commit; a cart that raced closed
    /// yields `CartNotOpen` with no effects.
    async fn checkout(&self, order: &Order, cart_id: CartId) -> Result<CheckoutOutcome>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Orders for a customer, newest first.
    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>>;

    /// Orders in a given status, newest first.
    async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    /// Atomically moves an order along a legal edge of the status
    /// machine, appending `note` and setting `tracking_number` when
    /// given. When `expected_from` is set, the order's current status
    /// must also match it, checked under the same lock; a mismatch is
    /// `Rejected` even if the edge itself is legal. Entering
    /// `Cancelled` restocks every line in the same commit.
    async fn transition_order(
        &self,
        id: OrderId,
        target: OrderStatus,
        expected_from: Option<OrderStatus>,
        note: Option<String>,
        tracking_number: Option<String>,
    ) -> Result<TransitionOutcome>;

    // Payments.

    /// Inserts a new payment attempt. The intent id must be unused.
    async fn insert_payment(&self, payment: &Payment) -> Result<()>;

    async fn find_payment_by_intent(&self, provider_intent_id: &str) -> Result<Option<Payment>>;

    /// Payments for an order, newest first.
    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>>;

    /// Payments across all of a customer's orders, newest first.
    async fn payments_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Payment>>;

    /// Atomically reconciles a provider notification against the payment
    /// carrying `provider_intent_id`, applying the idempotency rules and
    /// moving the order to `Paid` when a success lands on a payable
    /// order.
    async fn apply_payment_update(
        &self,
        provider_intent_id: &str,
        patch: PaymentPatch,
    ) -> Result<ReconcileOutcome>;
}
