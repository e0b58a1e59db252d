use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, Money, OrderId, PaymentId, ProductId};
use domain::{
    Cart, CartItem, CartStatus, Order, OrderItem, OrderStatus, Payment, PaymentStatus, Product,
    StatusNote,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{
    CheckoutOutcome, CommerceStore, PaymentPatch, ReconcileOutcome, StockAdjustment,
    TransitionOutcome,
};

/// PostgreSQL store backend.
///
/// Composite operations run inside explicit transactions; stock
/// decrements use conditional updates and order/payment reconciliation
/// takes `FOR UPDATE` row locks, so concurrent callers serialize on the
/// rows they touch.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects to the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wraps an already-configured pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_cart_items<'e>(
        executor: impl PgExecutor<'e>,
        cart_id: CartId,
    ) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            "SELECT product_id, quantity, unit_price_cents
             FROM cart_items WHERE cart_id = $1 ORDER BY product_id",
        )
        .bind(cart_id.as_uuid())
        .fetch_all(executor)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CartItem {
                    product_id: row.try_get::<String, _>("product_id")?.into(),
                    quantity: row.try_get::<i64, _>("quantity")? as u32,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                })
            })
            .collect()
    }

    async fn load_order_items<'e>(
        executor: impl PgExecutor<'e>,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT product_id, product_name, sku, quantity, unit_price_cents, total_price_cents
             FROM order_items WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(order_id.as_uuid())
        .fetch_all(executor)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    product_id: row.try_get::<String, _>("product_id")?.into(),
                    product_name: row.try_get("product_name")?,
                    sku: row.try_get("sku")?,
                    quantity: row.try_get::<i64, _>("quantity")? as u32,
                    unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                    total_price: Money::from_cents(row.try_get("total_price_cents")?),
                })
            })
            .collect()
    }

    /// Hydrates the order rows with their line items.
    async fn attach_items(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items =
                Self::load_order_items(&self.pool, OrderId::from_uuid(row.try_get("id")?)).await?;
            orders.push(row_to_order(&row, items)?);
        }
        Ok(orders)
    }
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get::<String, _>("id")?.into(),
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        stock_qty: row.try_get::<i64, _>("stock_qty")? as u32,
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_cart(row: &PgRow, items: Vec<CartItem>) -> Result<Cart> {
    Ok(Cart {
        id: CartId::from_uuid(row.try_get("id")?),
        customer_id: CustomerId::from_uuid(row.try_get("customer_id")?),
        status: row.try_get::<String, _>("status")?.parse::<CartStatus>()?,
        items,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
    let notes: Vec<StatusNote> = serde_json::from_value(row.try_get("notes")?)?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        customer_id: CustomerId::from_uuid(row.try_get("customer_id")?),
        cart_id: row
            .try_get::<Option<Uuid>, _>("cart_id")?
            .map(CartId::from_uuid),
        status: row.try_get::<String, _>("status")?.parse::<OrderStatus>()?,
        subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        shipping: Money::from_cents(row.try_get("shipping_cents")?),
        tax: Money::from_cents(row.try_get("tax_cents")?),
        discount: Money::from_cents(row.try_get("discount_cents")?),
        total: Money::from_cents(row.try_get("total_cents")?),
        currency: row.try_get("currency")?,
        tracking_number: row.try_get("tracking_number")?,
        notes,
        items,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn row_to_payment(row: &PgRow) -> Result<Payment> {
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        provider: row.try_get("provider")?,
        status: row
            .try_get::<String, _>("status")?
            .parse::<PaymentStatus>()?,
        amount: Money::from_cents(row.try_get("amount_cents")?),
        currency: row.try_get("currency")?,
        provider_intent_id: row.try_get("provider_intent_id")?,
        provider_payment_method_id: row.try_get("provider_payment_method_id")?,
        receipt_url: row.try_get("receipt_url")?,
        raw_payload: row.try_get("raw_payload")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

const SELECT_ORDER: &str = "SELECT id, customer_id, cart_id, status, subtotal_cents, \
     shipping_cents, tax_cents, discount_cents, total_cents, currency, tracking_number, \
     notes, created_at, updated_at FROM orders";

const SELECT_PAYMENT: &str = "SELECT id, order_id, provider, status, amount_cents, currency, \
     provider_intent_id, provider_payment_method_id, receipt_url, raw_payload, \
     created_at, updated_at FROM payments";

#[async_trait]
impl CommerceStore for PostgresStore {
    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, sku, unit_price_cents, stock_qty, is_active)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (id) DO UPDATE SET
                 name = EXCLUDED.name,
                 sku = EXCLUDED.sku,
                 unit_price_cents = EXCLUDED.unit_price_cents,
                 stock_qty = EXCLUDED.stock_qty,
                 is_active = EXCLUDED.is_active",
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.unit_price.cents())
        .bind(i64::from(product.stock_qty))
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, sku, unit_price_cents, stock_qty, is_active
             FROM products WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, sku, unit_price_cents, stock_qty, is_active
             FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn try_decrement_stock(
        &self,
        id: &ProductId,
        quantity: u32,
    ) -> Result<StockAdjustment> {
        let row = sqlx::query(
            "UPDATE products SET stock_qty = stock_qty - $2
             WHERE id = $1 AND stock_qty >= $2
             RETURNING stock_qty",
        )
        .bind(id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(StockAdjustment::Applied {
                remaining: row.try_get::<i64, _>("stock_qty")? as u32,
            });
        }

        let available = sqlx::query("SELECT stock_qty FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?
            .try_get::<i64, _>("stock_qty")? as u32;
        Ok(StockAdjustment::Insufficient { available })
    }

    async fn increment_stock(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET stock_qty = stock_qty + $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(id.clone()));
        }
        Ok(())
    }

    async fn get_or_create_open_cart(&self, customer_id: CustomerId) -> Result<Cart> {
        // The partial unique index arbitrates the race: the loser's
        // insert is a no-op and both callers read the same row back.
        let fresh = Cart::open(customer_id);
        sqlx::query(
            "INSERT INTO carts (id, customer_id, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (customer_id) WHERE status = 'open' DO NOTHING",
        )
        .bind(fresh.id.as_uuid())
        .bind(customer_id.as_uuid())
        .bind(fresh.status.as_str())
        .bind(fresh.created_at)
        .bind(fresh.updated_at)
        .execute(&self.pool)
        .await?;

        self.find_open_cart(customer_id)
            .await?
            .ok_or_else(|| StoreError::CartNotFound(fresh.id))
    }

    async fn find_open_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>> {
        let row = sqlx::query(
            "SELECT id, customer_id, status, created_at, updated_at
             FROM carts WHERE customer_id = $1 AND status = 'open'",
        )
        .bind(customer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let items =
            Self::load_cart_items(&self.pool, CartId::from_uuid(row.try_get("id")?)).await?;
        Ok(Some(row_to_cart(&row, items)?))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO carts (id, customer_id, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET
                 status = EXCLUDED.status,
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.id.as_uuid())
        .bind(cart.customer_id.as_uuid())
        .bind(cart.status.as_str())
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for item in &cart.items {
            sqlx::query(
                "INSERT INTO cart_items (cart_id, product_id, quantity, unit_price_cents)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(cart.id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn checkout(&self, order: &Order, cart_id: CartId) -> Result<CheckoutOutcome> {
        let mut tx = self.pool.begin().await?;

        for item in &order.items {
            let decremented = sqlx::query(
                "UPDATE products SET stock_qty = stock_qty - $2
                 WHERE id = $1 AND stock_qty >= $2",
            )
            .bind(item.product_id.as_str())
            .bind(i64::from(item.quantity))
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let available = sqlx::query("SELECT stock_qty FROM products WHERE id = $1")
                    .bind(item.product_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| StoreError::ProductNotFound(item.product_id.clone()))?
                    .try_get::<i64, _>("stock_qty")? as u32;
                tx.rollback().await?;
                return Ok(CheckoutOutcome::OutOfStock {
                    product_id: item.product_id.clone(),
                    available,
                });
            }
        }

        // The status filter arbitrates a double submit: only the first
        // commit finds the cart still open.
        let closed = sqlx::query(
            "UPDATE carts SET status = 'checked_out', updated_at = $2
             WHERE id = $1 AND status = 'open'",
        )
        .bind(cart_id.as_uuid())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if closed.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM carts WHERE id = $1")
                .bind(cart_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match exists {
                Some(_) => Ok(CheckoutOutcome::CartNotOpen),
                None => Err(StoreError::CartNotFound(cart_id)),
            };
        }

        sqlx::query(
            "INSERT INTO orders (id, customer_id, cart_id, status, subtotal_cents,
                 shipping_cents, tax_cents, discount_cents, total_cents, currency,
                 tracking_number, notes, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.cart_id.map(|id| id.as_uuid()))
        .bind(order.status.as_str())
        .bind(order.subtotal.cents())
        .bind(order.shipping.cents())
        .bind(order.tax.cents())
        .bind(order.discount.cents())
        .bind(order.total.cents())
        .bind(&order.currency)
        .bind(&order.tracking_number)
        .bind(serde_json::to_value(&order.notes)?)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, product_name, sku,
                     quantity, unit_price_cents, total_price_cents)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(order.id.as_uuid())
            .bind(item.product_id.as_str())
            .bind(&item.product_name)
            .bind(&item.sku)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(item.total_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(CheckoutOutcome::Created)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let items = Self::load_order_items(&self.pool, id).await?;
        Ok(Some(row_to_order(&row, items)?))
    }

    async fn orders_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        self.attach_items(rows).await
    }

    async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE status = $1 ORDER BY created_at DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        self.attach_items(rows).await
    }

    async fn transition_order(
        &self,
        id: OrderId,
        target: OrderStatus,
        expected_from: Option<OrderStatus>,
        note: Option<String>,
        tracking_number: Option<String>,
    ) -> Result<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(TransitionOutcome::NotFound);
        };

        let items = Self::load_order_items(&mut *tx, id).await?;
        let mut order = row_to_order(&row, items)?;
        if expected_from.is_some_and(|expected| expected != order.status) {
            return Ok(TransitionOutcome::Rejected {
                current: order.status,
            });
        }
        if !order.status.can_transition_to(target) {
            return Ok(TransitionOutcome::Rejected {
                current: order.status,
            });
        }

        if target == OrderStatus::Cancelled {
            for item in &order.items {
                let restocked =
                    sqlx::query("UPDATE products SET stock_qty = stock_qty + $2 WHERE id = $1")
                        .bind(item.product_id.as_str())
                        .bind(i64::from(item.quantity))
                        .execute(&mut *tx)
                        .await?;
                if restocked.rows_affected() == 0 {
                    return Err(StoreError::ProductNotFound(item.product_id.clone()));
                }
            }
        }

        order.status = target;
        if let Some(tracking) = tracking_number {
            order.tracking_number = Some(tracking);
        }
        if let Some(message) = note {
            order.push_note(message);
        } else {
            order.updated_at = Utc::now();
        }

        sqlx::query(
            "UPDATE orders SET status = $2, tracking_number = $3, notes = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(order.status.as_str())
        .bind(&order.tracking_number)
        .bind(serde_json::to_value(&order.notes)?)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(TransitionOutcome::Applied(order))
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO payments (id, order_id, provider, status, amount_cents, currency,
                 provider_intent_id, provider_payment_method_id, receipt_url, raw_payload,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(&payment.provider)
        .bind(payment.status.as_str())
        .bind(payment.amount.cents())
        .bind(&payment.currency)
        .bind(&payment.provider_intent_id)
        .bind(&payment.provider_payment_method_id)
        .bind(&payment.receipt_url)
        .bind(&payment.raw_payload)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("payments_provider_intent_id_key") =>
            {
                Err(StoreError::DuplicateIntent(
                    payment.provider_intent_id.clone(),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_payment_by_intent(&self, provider_intent_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!("{SELECT_PAYMENT} WHERE provider_intent_id = $1"))
            .bind(provider_intent_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_payment).transpose()
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE order_id = $1 ORDER BY created_at DESC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn payments_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            "SELECT p.id, p.order_id, p.provider, p.status, p.amount_cents, p.currency,
                 p.provider_intent_id, p.provider_payment_method_id, p.receipt_url,
                 p.raw_payload, p.created_at, p.updated_at
             FROM payments p
             JOIN orders o ON o.id = p.order_id
             WHERE o.customer_id = $1
             ORDER BY p.created_at DESC",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_payment).collect()
    }

    async fn apply_payment_update(
        &self,
        provider_intent_id: &str,
        patch: PaymentPatch,
    ) -> Result<ReconcileOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "{SELECT_PAYMENT} WHERE provider_intent_id = $1 FOR UPDATE"
        ))
        .bind(provider_intent_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(ReconcileOutcome::NotFound);
        };
        let mut payment = row_to_payment(&row)?;

        match domain::reconcile_action(payment.status, patch.status) {
            domain::ReconcileAction::Replay => {
                return Ok(ReconcileOutcome::Replayed { payment });
            }
            domain::ReconcileAction::Stale => {
                return Ok(ReconcileOutcome::Stale { payment });
            }
            domain::ReconcileAction::Apply => {}
        }

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

        sqlx::query(
            "UPDATE payments SET status = $2, provider_payment_method_id = $3,
                 receipt_url = $4, raw_payload = $5, updated_at = $6
             WHERE provider_intent_id = $1",
        )
        .bind(provider_intent_id)
        .bind(payment.status.as_str())
        .bind(&payment.provider_payment_method_id)
        .bind(&payment.receipt_url)
        .bind(&payment.raw_payload)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut updated_order = None;
        if patch.status == PaymentStatus::Succeeded {
            let order_row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1 FOR UPDATE"))
                .bind(payment.order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(order_row) = order_row {
                let items = Self::load_order_items(&mut *tx, payment.order_id).await?;
                let mut order = row_to_order(&order_row, items)?;
                if order.status.is_payable() {
                    order.status = OrderStatus::Paid;
                    order.push_note(format!("payment {provider_intent_id} succeeded"));
                    sqlx::query(
                        "UPDATE orders SET status = $2, notes = $3, updated_at = $4
                         WHERE id = $1",
                    )
                    .bind(order.id.as_uuid())
                    .bind(order.status.as_str())
                    .bind(serde_json::to_value(&order.notes)?)
                    .bind(order.updated_at)
                    .execute(&mut *tx)
                    .await?;
                    updated_order = Some(order);
                }
            }
        }

        tx.commit().await?;
        Ok(ReconcileOutcome::Applied {
            payment,
            order: updated_order,
        })
    }
}
