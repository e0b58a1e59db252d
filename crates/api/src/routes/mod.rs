//! HTTP route handlers and shared application state.

pub mod carts;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod products;

use engine::{CartManager, InMemoryGateway, OrderWorkflow, PaymentReconciler};
use store::CommerceStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CommerceStore> {
    pub store: S,
    pub carts: CartManager<S>,
    pub orders: OrderWorkflow<S>,
    pub payments: PaymentReconciler<S, InMemoryGateway>,
    pub gateway: InMemoryGateway,
}
