//! Shared types used across the commerce engine crates.

mod ids;
mod money;

pub use ids::{CartId, CustomerId, OrderId, PaymentId, ProductId};
pub use money::Money;
