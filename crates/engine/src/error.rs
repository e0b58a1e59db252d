use common::{OrderId, ProductId};
use domain::{OrderError, OrderStatus};
use store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by the engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("product not available: {0}")]
    ProductUnavailable(ProductId),

    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("product {0} is not in the cart")]
    ItemNotInCart(ProductId),

    #[error("cart is empty")]
    EmptyCart,

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("cannot transition order from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("order in status {status} cannot take a payment")]
    OrderNotPayable { status: OrderStatus },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
