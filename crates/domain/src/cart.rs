//! Shopping cart records.

use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, Money, ProductId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a cart.
///
/// A customer has exactly one `Open` cart at a time. Checkout moves the
/// cart to `CheckedOut`; a time-based sweep may mark stale carts
/// `Abandoned` (the sweep itself lives outside this engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Open,
    CheckedOut,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Open => "open",
            CartStatus::CheckedOut => "checked_out",
            CartStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CartStatus {
    type Err = crate::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(CartStatus::Open),
            "checked_out" => Ok(CartStatus::CheckedOut),
            "abandoned" => Ok(CartStatus::Abandoned),
            other => Err(crate::ParseStatusError(other.to_string())),
        }
    }
}

/// A product selection inside a cart.
///
/// `unit_price` is snapshotted from the product at the time of the first
/// add; merging more quantity later keeps the original snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the line total (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A customer's mutable pre-order basket.
///
/// The cart owns its items by value; at most one item per product
/// (adding an already-present product merges quantities).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub customer_id: CustomerId,
    pub status: CartStatus,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a fresh open cart for a customer.
    pub fn open(customer_id: CustomerId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            customer_id,
            status: CartStatus::Open,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the quantity currently in the cart for a product (0 if absent).
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| &item.product_id == product_id)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }

    /// Adds quantity for a product, merging into an existing line if present.
    ///
    /// The unit price is snapshotted only when the line is first created.
    pub fn merge_item(&mut self, product_id: ProductId, quantity: u32, unit_price: Money) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            item.quantity += quantity;
        } else {
            self.items.push(CartItem::new(product_id, quantity, unit_price));
        }
        self.touch();
    }

    /// Sets the absolute quantity for a product already in the cart.
    ///
    /// Returns false if the product has no line in this cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
        {
            Some(item) => {
                item.quantity = quantity;
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Removes a product's line. Idempotent: absent lines are fine.
    pub fn remove_item(&mut self, product_id: &ProductId) {
        self.items.retain(|item| &item.product_id != product_id);
        self.touch();
    }

    /// Empties the cart. Idempotent.
    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    /// Returns the sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::total_price).sum()
    }

    /// Returns the total quantity across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
