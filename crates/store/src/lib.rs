//! Transactional persistence boundary for the commerce engine.
//!
//! The [`CommerceStore`] trait exposes the operations the engine needs,
//! with the multi-entity ones (checkout, order transition, payment
//! reconciliation, cart get-or-insert) each guaranteed atomic by the
//! backend: all-or-nothing, and serialized against concurrent callers
//! touching the same rows.
//!
//! Two backends are provided: [`MemoryStore`] (single write lock per
//! operation) and [`PostgresStore`] (explicit transactions, conditional
//! updates and `SELECT ... FOR UPDATE` row locks).

mod error;
mod memory;
mod postgres;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    CheckoutOutcome, CommerceStore, PaymentPatch, ReconcileOutcome, StockAdjustment,
    TransitionOutcome,
};
