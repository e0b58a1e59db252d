//! Cart manager: the customer's pre-order basket.

use common::{CustomerId, ProductId};
use domain::{Cart, Product};
use store::CommerceStore;

use crate::error::{EngineError, Result};

/// Manages open carts for customers.
///
/// Stock checks here are advisory only: they keep obviously
/// unfulfillable quantities out of the cart, but reserve nothing. The
/// binding check happens at checkout inside the store's atomic commit.
pub struct CartManager<S: CommerceStore> {
    store: S,
}

impl<S: CommerceStore> CartManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the customer's open cart, creating one if none exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, customer_id: CustomerId) -> Result<Cart> {
        Ok(self.store.get_or_create_open_cart(customer_id).await?)
    }

    /// Returns the customer's open cart without creating one.
    pub async fn get_open_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>> {
        Ok(self.store.find_open_cart(customer_id).await?)
    }

    /// Adds quantity of a product, merging into an existing line.
    ///
    /// The unit price is snapshotted from the catalog on the first add.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity { quantity });
        }
        let product = self.purchasable_product(&product_id).await?;

        let mut cart = self.store.get_or_create_open_cart(customer_id).await?;
        let requested = cart.quantity_of(&product_id) + quantity;
        if requested > product.stock_qty {
            return Err(EngineError::InsufficientStock {
                product_id,
                requested,
                available: product.stock_qty,
            });
        }

        cart.merge_item(product_id, quantity, product.unit_price);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Sets the absolute quantity of a line already in the cart.
    #[tracing::instrument(skip(self))]
    pub async fn set_item_quantity(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity { quantity });
        }
        let product = self.purchasable_product(&product_id).await?;
        if quantity > product.stock_qty {
            return Err(EngineError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock_qty,
            });
        }

        let mut cart = self.store.get_or_create_open_cart(customer_id).await?;
        if !cart.set_quantity(&product_id, quantity) {
            return Err(EngineError::ItemNotInCart(product_id));
        }
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Removes a product's line. Idempotent: removing an absent line
    /// leaves the cart unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<Cart> {
        let mut cart = self.store.get_or_create_open_cart(customer_id).await?;
        cart.remove_item(&product_id);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Empties the cart. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, customer_id: CustomerId) -> Result<Cart> {
        let mut cart = self.store.get_or_create_open_cart(customer_id).await?;
        cart.clear();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    async fn purchasable_product(&self, product_id: &ProductId) -> Result<Product> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(product_id.clone()))?;
        if !product.is_active {
            return Err(EngineError::ProductUnavailable(product_id.clone()));
        }
        Ok(product)
    }
}
