//! Commerce engine services.
//!
//! Three services sit between the HTTP surface and the store:
//! [`CartManager`] for the pre-order basket, [`OrderWorkflow`] for
//! checkout and the order status machine, and [`PaymentReconciler`] for
//! the payment provider boundary. Each is generic over the
//! [`store::CommerceStore`] backend.

mod cart_manager;
mod error;
mod gateway;
mod order_workflow;
mod payment_reconciler;

pub use cart_manager::CartManager;
pub use error::{EngineError, Result};
pub use gateway::{
    CreateIntentRequest, GatewayError, InMemoryGateway, IntentHandle, PaymentGateway,
};
pub use order_workflow::{CheckoutRequest, OrderWorkflow};
pub use payment_reconciler::PaymentReconciler;
