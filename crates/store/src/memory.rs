use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CustomerId, OrderId, ProductId};
use domain::{Cart, CartStatus, Order, OrderStatus, Payment, PaymentStatus, Product};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::store::{
    CheckoutOutcome, CommerceStore, PaymentPatch, ReconcileOutcome, StockAdjustment,
    TransitionOutcome,
};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    orders: HashMap<OrderId, Order>,
    payments: Vec<Payment>,
}

/// In-memory store backend for tests and local development.
///
/// Every operation takes the single write or read lock once, so each
/// composite operation is atomic with respect to every other. Mutating
/// composites check fully before applying; a rejected outcome leaves the
/// tables untouched.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(products)
    }

    async fn try_decrement_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<StockAdjustment> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(id)
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;
        if product.stock_qty < quantity {
            return Ok(StockAdjustment::Insufficient {
                available: product.stock_qty,
            });
        }
        product.stock_qty -= quantity;
        Ok(StockAdjustment::Applied {
            remaining: product.stock_qty,
        })
    }

    async fn increment_stock(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(id)
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;
        product.stock_qty += quantity;
        Ok(())
    }

    async fn get_or_create_open_cart(&self, customer_id: CustomerId) -> Result<Cart> {
        let mut tables = self.tables.write().await;
        if let Some(cart) = tables
            .carts
            .values()
            .find(|cart| cart.customer_id == customer_id && cart.status == CartStatus::Open)
        {
            return Ok(cart.clone());
        }
        let cart = Cart::open(customer_id);
        tables.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn find_open_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .values()
            .find(|cart| cart.customer_id == customer_id && cart.status == CartStatus::Open)
            .cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn checkout(&self, order: &Order, cart_id: CartId) -> Result<CheckoutOutcome> {
        let mut tables = self.tables.write().await;
        let cart_status = tables
            .carts
            .get(&cart_id)
            .map(|cart| cart.status)
            .ok_or(StoreError::CartNotFound(cart_id))?;
        if cart_status != CartStatus::Open {
            return Ok(CheckoutOutcome::CartNotOpen);
        }

        // First pass: verify every line is covered before touching stock.
        for item in &order.items {
            let product = tables
                .products
                .get(&item.product_id)
                .ok_or_else(|| StoreError::ProductNotFound(item.product_id.clone()))?;
            if product.stock_qty < item.quantity {
                return Ok(CheckoutOutcome::OutOfStock {
                    product_id: item.product_id.clone(),
                    available: product.stock_qty,
                });
            }
        }

        for item in &order.items {
            let product = tables
                .products
                .get_mut(&item.product_id)
                .expect("verified in first pass");
            product.stock_qty -= item.quantity;
        }

        let cart = tables.carts.get_mut(&cart_id).expect("checked above");
        cart.status = CartStatus::CheckedOut;
        cart.updated_at = Utc::now();

        tables.orders.insert(order.id, order.clone());
        Ok(CheckoutOutcome::Created)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|order| order.status == status)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition_order(
        &self,
        id: OrderId,
        target: OrderStatus,
        expected_from: Option<OrderStatus>,
        note: Option<String>,
        tracking_number: Option<String>,
    ) -> Result<TransitionOutcome> {
        let mut tables = self.tables.write().await;
        let current = match tables.orders.get(&id) {
            Some(order) => order.status,
            None => return Ok(TransitionOutcome::NotFound),
        };
        if expected_from.is_some_and(|expected| expected != current) {
            return Ok(TransitionOutcome::Rejected { current });
        }
        if !current.can_transition_to(target) {
            return Ok(TransitionOutcome::Rejected { current });
        }

        if target == OrderStatus::Cancelled {
            // Verify the catalog still knows every line before restocking.
            let lines: Vec<(ProductId, u32)> = tables.orders[&id]
                .items
                .iter()
                .map(|item| (item.product_id.clone(), item.quantity))
                .collect();
            for (product_id, _) in &lines {
                if !tables.products.contains_key(product_id) {
                    return Err(StoreError::ProductNotFound(product_id.clone()));
                }
            }
            for (product_id, quantity) in lines {
                let product = tables
                    .products
                    .get_mut(&product_id)
                    .expect("verified above");
                product.stock_qty += quantity;
            }
        }

        let order = tables.orders.get_mut(&id).expect("checked above");
        order.status = target;
        if let Some(tracking) = tracking_number {
            order.tracking_number = Some(tracking);
        }
        if let Some(message) = note {
            order.push_note(message);
        } else {
            order.updated_at = Utc::now();
        }
        Ok(TransitionOutcome::Applied(order.clone()))
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .payments
            .iter()
            .any(|existing| existing.provider_intent_id == payment.provider_intent_id)
        {
            return Err(StoreError::DuplicateIntent(
                payment.provider_intent_id.clone(),
            ));
        }
        tables.payments.push(payment.clone());
        Ok(())
    }

    async fn find_payment_by_intent(&self, provider_intent_id: &str) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .iter()
            .find(|payment| payment.provider_intent_id == provider_intent_id)
            .cloned())
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|payment| payment.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn payments_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|payment| {
                tables
                    .orders
                    .get(&payment.order_id)
                    .is_some_and(|order| order.customer_id == customer_id)
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn apply_payment_update(
        &self,
        provider_intent_id: &str,
        patch: PaymentPatch,
    ) -> Result<ReconcileOutcome> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables
            .payments
            .iter()
            .position(|payment| payment.provider_intent_id == provider_intent_id)
        else {
            return Ok(ReconcileOutcome::NotFound);
        };

        let current = tables.payments[index].status;
        match domain::reconcile_action(current, patch.status) {
            domain::ReconcileAction::Replay => {
                return Ok(ReconcileOutcome::Replayed {
                    payment: tables.payments[index].clone(),
                });
            }
            domain::ReconcileAction::Stale => {
                return Ok(ReconcileOutcome::Stale {
                    payment: tables.payments[index].clone(),
                });
            }
            domain::ReconcileAction::Apply => {}
        }

        let order_id = {
            let payment = &mut tables.payments[index];
            payment.status = patch.status;
            if patch.payment_method_id.is_some() {
                payment.provider_payment_method_id = patch.payment_method_id;
            }
            if patch.receipt_url.is_some() {
                payment.receipt_url = patch.receipt_url;
            }
            if patch.raw_payload.is_some() {
                payment.raw_payload = patch.raw_payload;
            }
            payment.updated_at = Utc::now();
            payment.order_id
        };
        let payment = tables.payments[index].clone();

        let mut updated_order = None;
        if patch.status == PaymentStatus::Succeeded {
            if let Some(order) = tables.orders.get_mut(&order_id) {
                if order.status.is_payable() {
                    order.status = OrderStatus::Paid;
                    order.push_note(format!("payment {provider_intent_id} succeeded"));
                    updated_order = Some(order.clone());
                }
            }
        }

        Ok(ReconcileOutcome::Applied {
            payment,
            order: updated_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::{OrderCharges, OrderItem};

    fn product(id: &str, stock: u32, cents: i64) -> Product {
        Product::new(id, format!("Product {id}"), id, Money::from_cents(cents), stock)
    }

    fn pending_order(customer_id: CustomerId, cart_id: CartId, lines: &[(&str, u32, i64)]) -> Order {
        let items = lines
            .iter()
            .map(|(id, qty, cents)| {
                OrderItem::new(*id, format!("Product {id}"), *id, *qty, Money::from_cents(*cents))
                    .unwrap()
            })
            .collect();
        Order::new(
            customer_id,
            Some(cart_id),
            items,
            OrderCharges::default(),
            "EUR",
            None,
        )
        .unwrap()
    }

    async fn seeded_checkout(store: &MemoryStore, lines: &[(&str, u32, i64)]) -> Order {
        let customer_id = CustomerId::new();
        let cart = store.get_or_create_open_cart(customer_id).await.unwrap();
        let order = pending_order(customer_id, cart.id, lines);
        let outcome = store.checkout(&order, cart.id).await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Created);
        order
    }

    #[tokio::test]
    async fn decrement_respects_available_stock() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 3, 500)).await.unwrap();

        let adjustment = store
            .try_decrement_stock(&"SKU-001".into(), 2)
            .await
            .unwrap();
        assert_eq!(adjustment, StockAdjustment::Applied { remaining: 1 });

        let adjustment = store
            .try_decrement_stock(&"SKU-001".into(), 2)
            .await
            .unwrap();
        assert_eq!(adjustment, StockAdjustment::Insufficient { available: 1 });
    }

    #[tokio::test]
    async fn decrement_unknown_product_is_an_error() {
        let store = MemoryStore::new();
        let result = store.try_decrement_stock(&"SKU-404".into(), 1).await;
        assert!(matches!(result, Err(StoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn open_cart_is_reused() {
        let store = MemoryStore::new();
        let customer_id = CustomerId::new();

        let first = store.get_or_create_open_cart(customer_id).await.unwrap();
        let second = store.get_or_create_open_cart(customer_id).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = store.get_or_create_open_cart(CustomerId::new()).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn checked_out_cart_is_not_reused() {
        let store = MemoryStore::new();
        let customer_id = CustomerId::new();

        let mut cart = store.get_or_create_open_cart(customer_id).await.unwrap();
        cart.status = CartStatus::CheckedOut;
        store.save_cart(&cart).await.unwrap();

        let next = store.get_or_create_open_cart(customer_id).await.unwrap();
        assert_ne!(next.id, cart.id);
        assert_eq!(next.status, CartStatus::Open);
    }

    #[tokio::test]
    async fn checkout_decrements_stock_and_closes_cart() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 10, 500)).await.unwrap();
        store.upsert_product(&product("SKU-002", 3, 1000)).await.unwrap();

        let customer_id = CustomerId::new();
        let cart = store.get_or_create_open_cart(customer_id).await.unwrap();
        let order = pending_order(
            customer_id,
            cart.id,
            &[("SKU-001", 2, 500), ("SKU-002", 1, 1000)],
        );

        let outcome = store.checkout(&order, cart.id).await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Created);

        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        let b = store.get_product(&"SKU-002".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 8);
        assert_eq!(b.stock_qty, 2);

        let cart = store.find_open_cart(customer_id).await.unwrap();
        assert!(cart.is_none());

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total, Money::from_cents(2000));
    }

    #[tokio::test]
    async fn checkout_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 10, 500)).await.unwrap();
        store.upsert_product(&product("SKU-002", 1, 1000)).await.unwrap();

        let customer_id = CustomerId::new();
        let cart = store.get_or_create_open_cart(customer_id).await.unwrap();
        let order = pending_order(
            customer_id,
            cart.id,
            &[("SKU-001", 2, 500), ("SKU-002", 2, 1000)],
        );

        let outcome = store.checkout(&order, cart.id).await.unwrap();
        assert_eq!(
            outcome,
            CheckoutOutcome::OutOfStock {
                product_id: "SKU-002".into(),
                available: 1,
            }
        );

        // No partial effects: stock untouched, cart still open, no order.
        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 10);
        let cart = store.find_open_cart(customer_id).await.unwrap().unwrap();
        assert_eq!(cart.status, CartStatus::Open);
        assert!(store.get_order(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn checkout_rejects_a_cart_already_checked_out() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 10, 500)).await.unwrap();

        let customer_id = CustomerId::new();
        let cart = store.get_or_create_open_cart(customer_id).await.unwrap();
        let first = pending_order(customer_id, cart.id, &[("SKU-001", 2, 500)]);
        let outcome = store.checkout(&first, cart.id).await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::Created);

        // A double submit that read the cart before the first commit
        // closed it must not mint a second order.
        let second = pending_order(customer_id, cart.id, &[("SKU-001", 2, 500)]);
        let outcome = store.checkout(&second, cart.id).await.unwrap();
        assert_eq!(outcome, CheckoutOutcome::CartNotOpen);

        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 8);
        assert!(store.get_order(second.id).await.unwrap().is_none());
        assert_eq!(store.orders_for_customer(customer_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transition_follows_the_edge_table() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;

        let outcome = store
            .transition_order(order.id, OrderStatus::Confirmed, None, None, None)
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied(_)));

        let outcome = store
            .transition_order(order.id, OrderStatus::Delivered, None, None, None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Rejected {
                current: OrderStatus::Confirmed,
            }
        );
    }

    #[tokio::test]
    async fn transition_records_note_and_tracking() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;

        store
            .transition_order(order.id, OrderStatus::Confirmed, None, None, None)
            .await
            .unwrap();
        let outcome = store
            .transition_order(
                order.id,
                OrderStatus::Shipped,
                None,
                Some("handed to carrier".to_string()),
                Some("TRK-42".to_string()),
            )
            .await
            .unwrap();

        let TransitionOutcome::Applied(updated) = outcome else {
            panic!("expected applied transition");
        };
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert_eq!(updated.tracking_number.as_deref(), Some("TRK-42"));
        assert_eq!(updated.notes.last().unwrap().message, "handed to carrier");
    }

    #[tokio::test]
    async fn cancellation_restores_stock_once() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 3, 500)]).await;

        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 2);

        let outcome = store
            .transition_order(order.id, OrderStatus::Cancelled, None, None, None)
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Applied(_)));

        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 5);

        // Cancelled is terminal; a second cancel must not restock again.
        let outcome = store
            .transition_order(order.id, OrderStatus::Cancelled, None, None, None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Rejected {
                current: OrderStatus::Cancelled,
            }
        );
        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 5);
    }

    #[tokio::test]
    async fn expected_status_narrows_a_legal_edge() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 2, 500)]).await;

        store
            .transition_order(order.id, OrderStatus::Confirmed, None, None, None)
            .await
            .unwrap();

        // Confirmed -> Cancelled is in the edge table, but a caller that
        // only agreed to cancel a pending order is rejected under the
        // same lock.
        let outcome = store
            .transition_order(
                order.id,
                OrderStatus::Cancelled,
                Some(OrderStatus::Pending),
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Rejected {
                current: OrderStatus::Confirmed,
            }
        );

        // Nothing was restocked or written.
        let a = store.get_product(&"SKU-001".into()).await.unwrap().unwrap();
        assert_eq!(a.stock_qty, 3);
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn duplicate_intent_id_rejected() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;

        let payment = Payment::new(order.id, "stripe", order.total, "EUR", "pi_1");
        store.insert_payment(&payment).await.unwrap();

        let duplicate = Payment::new(order.id, "stripe", order.total, "EUR", "pi_1");
        let result = store.insert_payment(&duplicate).await;
        assert!(matches!(result, Err(StoreError::DuplicateIntent(_))));
    }

    #[tokio::test]
    async fn successful_reconcile_marks_order_paid() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;

        let payment = Payment::new(order.id, "stripe", order.total, "EUR", "pi_1");
        store.insert_payment(&payment).await.unwrap();

        let outcome = store
            .apply_payment_update(
                "pi_1",
                PaymentPatch {
                    status: PaymentStatus::Succeeded,
                    payment_method_id: Some("pm_1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ReconcileOutcome::Applied { payment, order: updated } = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.provider_payment_method_id.as_deref(), Some("pm_1"));
        let updated = updated.expect("order should move to paid");
        assert_eq!(updated.status, OrderStatus::Paid);
    }

    #[tokio::test]
    async fn replayed_success_is_a_noop() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;
        let payment = Payment::new(order.id, "stripe", order.total, "EUR", "pi_1");
        store.insert_payment(&payment).await.unwrap();

        let patch = PaymentPatch {
            status: PaymentStatus::Succeeded,
            ..Default::default()
        };
        store.apply_payment_update("pi_1", patch.clone()).await.unwrap();
        let outcome = store.apply_payment_update("pi_1", patch).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Replayed { .. }));
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        // Only one success note was written.
        let success_notes = stored
            .notes
            .iter()
            .filter(|note| note.message.contains("succeeded"))
            .count();
        assert_eq!(success_notes, 1);
    }

    #[tokio::test]
    async fn stale_update_cannot_regress_terminal_payment() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;
        let payment = Payment::new(order.id, "stripe", order.total, "EUR", "pi_1");
        store.insert_payment(&payment).await.unwrap();

        store
            .apply_payment_update(
                "pi_1",
                PaymentPatch {
                    status: PaymentStatus::Succeeded,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let outcome = store
            .apply_payment_update(
                "pi_1",
                PaymentPatch {
                    status: PaymentStatus::Processing,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Stale { .. }));

        let stored = store.find_payment_by_intent("pi_1").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn reconcile_unknown_intent_reports_not_found() {
        let store = MemoryStore::new();
        let outcome = store
            .apply_payment_update(
                "pi_missing",
                PaymentPatch {
                    status: PaymentStatus::Succeeded,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::NotFound);
    }

    #[tokio::test]
    async fn success_on_shipped_order_updates_payment_only() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 5, 500)).await.unwrap();
        let order = seeded_checkout(&store, &[("SKU-001", 1, 500)]).await;
        let payment = Payment::new(order.id, "stripe", order.total, "EUR", "pi_1");
        store.insert_payment(&payment).await.unwrap();

        store
            .transition_order(order.id, OrderStatus::Confirmed, None, None, None)
            .await
            .unwrap();
        store
            .transition_order(order.id, OrderStatus::Shipped, None, None, None)
            .await
            .unwrap();

        let outcome = store
            .apply_payment_update(
                "pi_1",
                PaymentPatch {
                    status: PaymentStatus::Succeeded,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let ReconcileOutcome::Applied { payment, order: updated } = outcome else {
            panic!("expected applied outcome");
        };
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert!(updated.is_none());
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn listings_are_newest_first() {
        let store = MemoryStore::new();
        store.upsert_product(&product("SKU-001", 50, 500)).await.unwrap();

        let customer_id = CustomerId::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let cart = store.get_or_create_open_cart(customer_id).await.unwrap();
            let order = pending_order(customer_id, cart.id, &[("SKU-001", 1, 500)]);
            store.checkout(&order, cart.id).await.unwrap();
            ids.push(order.id);
        }

        let orders = store.orders_for_customer(customer_id).await.unwrap();
        assert_eq!(orders.len(), 3);
        assert!(orders.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let pending = store
            .orders_with_status(OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 3);
    }
}
