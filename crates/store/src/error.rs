use common::{CartId, ProductId};
use thiserror::Error;

/// Errors surfaced by a store backend.
///
/// Outcomes a caller is expected to branch on (insufficient stock,
/// illegal transition, unknown intent) are not errors; they come back as
/// outcome enums from the composite operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("cart not found: {0}")]
    CartNotFound(CartId),

    #[error("duplicate provider intent id: {0}")]
    DuplicateIntent(String),

    /// A persisted status string no longer parses. Indicates a schema
    /// migration gone wrong, not a caller mistake.
    #[error("corrupt stored status: {0}")]
    CorruptStatus(#[from] domain::ParseStatusError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
