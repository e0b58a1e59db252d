//! Entity records and state machines for the order lifecycle engine.
//!
//! This crate is pure data and decision logic: carts, orders, payments,
//! their status machines with explicit allowed-edge tables, and the
//! reconciliation decision for provider notifications. Persistence and
//! orchestration live in the `store` and `engine` crates.

mod cart;
mod order;
mod payment;
mod product;

pub use cart::{Cart, CartItem, CartStatus};
pub use order::{
    Order, OrderCharges, OrderError, OrderItem, OrderStatus, ParseStatusError, StatusNote,
};
pub use payment::{Payment, PaymentStatus, ReconcileAction, reconcile_action};
pub use product::Product;
