//! Order records and the order status machine.

mod status;

pub use status::OrderStatus;

use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::Cart;
use crate::product::Product;

/// A status enum received text that no variant matches.
#[derive(Debug, Error)]
#[error("unknown status: {0}")]
pub struct ParseStatusError(pub String);

/// Errors raised while building or validating an order snapshot.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The source cart has no items.
    #[error("cart has no items, cannot create an order")]
    EmptyCart,

    /// A line item quantity below 1.
    #[error("invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// A monetary field is negative.
    #[error("negative amount: {amount}")]
    NegativeAmount { amount: Money },

    /// Discount larger than the sum of subtotal, shipping and tax.
    #[error("discount {discount} exceeds charges {charges}")]
    DiscountExceedsCharges { discount: Money, charges: Money },

    /// Order total must be strictly positive.
    #[error("order total must be positive, got {total}")]
    NonPositiveTotal { total: Money },
}

/// A write-once order line.
///
/// Product name and SKU are denormalized at order time so historical
/// orders are unaffected by later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,
}

impl OrderItem {
    /// Creates an order line, computing the line total.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        sku: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        Ok(Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            sku: sku.into(),
            quantity,
            unit_price,
            total_price: unit_price.multiply(quantity),
        })
    }
}

/// A timestamped entry in the order's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNote {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl StatusNote {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

/// Non-item charges applied at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCharges {
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
}

/// An immutable order snapshot.
///
/// Once created, only `status`, `tracking_number`, `notes` and the payment
/// collection (held separately) may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Back-reference to the cart this order was created from, if any.
    pub cart_id: Option<CartId>,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: String,
    pub tracking_number: Option<String>,
    pub notes: Vec<StatusNote>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a `Pending` order from prepared line items.
    ///
    /// Enforces at creation time: at least one item, no negative monetary
    /// field, `discount <= subtotal + shipping + tax`, and
    /// `total = subtotal + shipping + tax - discount > 0`.
    pub fn new(
        customer_id: CustomerId,
        cart_id: Option<CartId>,
        items: Vec<OrderItem>,
        charges: OrderCharges,
        currency: impl Into<String>,
        note: Option<String>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        for amount in [charges.shipping, charges.tax, charges.discount] {
            if amount.is_negative() {
                return Err(OrderError::NegativeAmount { amount });
            }
        }

        let subtotal: Money = items.iter().map(|item| item.total_price).sum();
        let gross = subtotal + charges.shipping + charges.tax;
        if charges.discount > gross {
            return Err(OrderError::DiscountExceedsCharges {
                discount: charges.discount,
                charges: gross,
            });
        }
        let total = gross - charges.discount;
        if !total.is_positive() {
            return Err(OrderError::NonPositiveTotal { total });
        }

        let now = Utc::now();
        let notes = note
            .filter(|n| !n.trim().is_empty())
            .map(|n| vec![StatusNote::now(n)])
            .unwrap_or_default();

        Ok(Self {
            id: OrderId::new(),
            customer_id,
            cart_id,
            status: OrderStatus::Pending,
            subtotal,
            shipping: charges.shipping,
            tax: charges.tax,
            discount: charges.discount,
            total,
            currency: currency.into(),
            tracking_number: None,
            notes,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds the order line items from a cart, denormalizing product
    /// name and SKU from the catalog snapshot passed in.
    ///
    /// `products` must contain every product referenced by the cart; the
    /// caller (the workflow) loads them in the same operation.
    pub fn items_from_cart<'a>(
        cart: &Cart,
        mut lookup: impl FnMut(&ProductId) -> Option<&'a Product>,
    ) -> Result<Vec<OrderItem>, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        cart.items
            .iter()
            .map(|line| {
                let (name, sku) = match lookup(&line.product_id) {
                    Some(product) => (product.name.clone(), product.sku.clone()),
                    // Product vanished from the catalog between add and
                    // checkout; keep the id as the display name.
                    None => (line.product_id.to_string(), line.product_id.to_string()),
                };
                OrderItem::new(
                    line.product_id.clone(),
                    name,
                    sku,
                    line.quantity,
                    line.unit_price,
                )
            })
            .collect()
    }

    /// Appends a timestamped note to the audit trail.
    pub fn push_note(&mut self, message: impl Into<String>) {
        self.notes.push(StatusNote::now(message));
        self.updated_at = Utc::now();
    }

    /// Returns the ordered quantity for a product (0 if not a line item).
    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| &item.product_id == product_id)
            .map(|item| item.quantity)
            .unwrap_or(0)
    }
}
