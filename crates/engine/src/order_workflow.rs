//! Order workflow: checkout and the order status machine.

use std::collections::HashMap;

use common::{CustomerId, OrderId, ProductId};
use domain::{Order, OrderCharges, OrderStatus, Product};
use metrics::counter;
use store::{CheckoutOutcome, CommerceStore, TransitionOutcome};

use crate::error::{EngineError, Result};

/// Checkout parameters beyond the cart contents.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub charges: OrderCharges,
    pub currency: String,
    pub note: Option<String>,
}

impl Default for CheckoutRequest {
    fn default() -> Self {
        Self {
            charges: OrderCharges::default(),
            currency: "EUR".to_string(),
            note: None,
        }
    }
}

/// Drives orders through their lifecycle.
///
/// Checkout converts the customer's open cart into a `Pending` order in
/// one atomic store commit: stock decremented per line, order inserted,
/// cart closed. Status changes go through the edge table in
/// [`domain::OrderStatus`]; entering `Cancelled` restocks every line in
/// the same commit.
pub struct OrderWorkflow<S: CommerceStore> {
    store: S,
}

impl<S: CommerceStore> OrderWorkflow<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a `Pending` order from the customer's open cart.
    #[tracing::instrument(skip(self, request))]
    pub async fn create_from_cart(
        &self,
        customer_id: CustomerId,
        request: CheckoutRequest,
    ) -> Result<Order> {
        let cart = self
            .store
            .find_open_cart(customer_id)
            .await?
            .ok_or(EngineError::EmptyCart)?;
        if cart.is_empty() {
            return Err(EngineError::EmptyCart);
        }

        let mut catalog: HashMap<ProductId, Product> = HashMap::new();
        for line in &cart.items {
            let product = self
                .store
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| EngineError::ProductNotFound(line.product_id.clone()))?;
            catalog.insert(line.product_id.clone(), product);
        }

        let items = Order::items_from_cart(&cart, |id| catalog.get(id))?;
        let order = Order::new(
            customer_id,
            Some(cart.id),
            items,
            request.charges,
            request.currency,
            request.note,
        )?;

        match self.store.checkout(&order, cart.id).await? {
            CheckoutOutcome::Created => {
                counter!("orders_created_total").increment(1);
                tracing::info!(order_id = %order.id, total = %order.total, "order created");
                Ok(order)
            }
            CheckoutOutcome::OutOfStock {
                product_id,
                available,
            } => {
                let requested = order.quantity_of(&product_id);
                Err(EngineError::InsufficientStock {
                    product_id,
                    requested,
                    available,
                })
            }
            // A racing checkout closed the cart between our read and
            // the commit; the caller sees the same error as having no
            // open cart at all.
            CheckoutOutcome::CartNotOpen => Err(EngineError::EmptyCart),
        }
    }

    /// Moves an order along a legal edge, optionally recording a note.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        self.apply_transition(order_id, target, None, note, None)
            .await
    }

    /// Confirms a `Pending` order.
    pub async fn confirm(&self, order_id: OrderId) -> Result<Order> {
        self.transition(
            order_id,
            OrderStatus::Confirmed,
            Some("order confirmed".to_string()),
        )
        .await
    }

    /// Ships an order, recording the carrier tracking number.
    #[tracing::instrument(skip(self))]
    pub async fn ship(&self, order_id: OrderId, tracking_number: String) -> Result<Order> {
        let note = format!("shipped with tracking {tracking_number}");
        self.apply_transition(
            order_id,
            OrderStatus::Shipped,
            None,
            Some(note),
            Some(tracking_number),
        )
        .await
    }

    /// Marks a shipped order delivered.
    pub async fn deliver(&self, order_id: OrderId) -> Result<Order> {
        self.transition(order_id, OrderStatus::Delivered, Some("delivered".to_string()))
            .await
    }

    /// Cancels an order, restoring its stock.
    ///
    /// Customer-facing cancellation is only offered while the order is
    /// still `Pending`; later stages go through returns, outside this
    /// engine.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId, reason: Option<String>) -> Result<Order> {
        let note = reason.unwrap_or_else(|| "cancelled by customer".to_string());
        // The pending-only narrowing rides into the store so a racing
        // confirm cannot slip between a status read and the write.
        let order = self
            .apply_transition(
                order_id,
                OrderStatus::Cancelled,
                Some(OrderStatus::Pending),
                Some(note),
                None,
            )
            .await?;
        counter!("orders_cancelled_total").increment(1);
        Ok(order)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))
    }

    /// Orders for a customer, newest first.
    pub async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_customer(customer_id).await?)
    }

    /// Orders in a given status, newest first.
    pub async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        Ok(self.store.orders_with_status(status).await?)
    }

    async fn apply_transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        expected_from: Option<OrderStatus>,
        note: Option<String>,
        tracking_number: Option<String>,
    ) -> Result<Order> {
        match self
            .store
            .transition_order(order_id, target, expected_from, note, tracking_number)
            .await?
        {
            TransitionOutcome::Applied(order) => {
                counter!("order_transitions_total", "target" => target.as_str()).increment(1);
                tracing::info!(order_id = %order_id, target = %target, "order transitioned");
                Ok(order)
            }
            TransitionOutcome::Rejected { current } => Err(EngineError::InvalidTransition {
                from: current,
                to: target,
            }),
            TransitionOutcome::NotFound => Err(EngineError::OrderNotFound(order_id)),
        }
    }
}
