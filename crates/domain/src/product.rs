//! Catalog product record.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product referenced by carts and orders.
///
/// The engine never owns products; it reads them for price/name snapshots
/// and mutates `stock_qty` exclusively through the store's stock ledger
/// primitives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit_price: Money,
    pub stock_qty: u32,
    pub is_active: bool,
}

impl Product {
    /// Creates an active product with the given starting stock.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        sku: impl Into<String>,
        unit_price: Money,
        stock_qty: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sku: sku.into(),
            unit_price,
            stock_qty,
            is_active: true,
        }
    }

    /// Marks the product inactive (not purchasable).
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
