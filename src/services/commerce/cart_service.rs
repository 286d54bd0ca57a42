use crate::{
    errors::ServiceError,
    models::Cart,
    store::{Collection, RecordStore},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service.
///
/// Every mutating operation is a serialised read-modify-write over the
/// whole cart collection, so concurrent requests against the same cart (or
/// different carts) never lose each other's updates. Each call returns only
/// after the new state has been persisted.
///
/// The service does not look products up in the catalog: a line may refer
/// to a product that has since been deleted, and readers are expected to
/// resolve such lines as unknown.
///
/// # Examples
///
/// ```ignore
/// use storefront_api::services::commerce::CartService;
///
/// let cart = carts.create().await?;
/// let cart = carts.add_product(cart.id, product_id).await?;
/// assert_eq!(cart.lines[0].quantity, 1);
/// ```
#[derive(Clone)]
pub struct CartService {
    carts: Arc<Collection<Cart>>,
}

impl CartService {
    /// Loads the cart collection from `store`.
    pub async fn new(store: Arc<dyn RecordStore<Cart>>, persist_timeout: Duration) -> Self {
        Self {
            carts: Arc::new(Collection::load(store, persist_timeout).await),
        }
    }

    /// Creates an empty cart with a fresh id.
    #[instrument(skip(self))]
    pub async fn create(&self) -> Result<Cart, ServiceError> {
        let cart = Cart::new(Uuid::new_v4());
        let created = cart.clone();

        self.carts
            .mutate(move |carts| {
                carts.insert(cart.id, cart);
                Ok(())
            })
            .await?;

        info!(cart_id = %created.id, "Created cart");
        Ok(created)
    }

    /// Get a cart by ID
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, cart_id: Uuid) -> Result<Cart, ServiceError> {
        self.carts.get(cart_id).await.ok_or_else(|| cart_not_found(cart_id))
    }

    /// Adds one unit of a product to a cart.
    ///
    /// An existing line for the product is incremented; otherwise a new line
    /// with quantity 1 is appended.
    ///
    /// # Arguments
    ///
    /// * `cart_id` - The cart to modify
    /// * `product_id` - The product to add; its existence is the caller's concern
    ///
    /// # Returns
    ///
    /// * `Ok(Cart)` - The cart after the write
    /// * `Err(ServiceError::NotFound)` - No cart with `cart_id`
    #[instrument(skip(self))]
    pub async fn add_product(&self, cart_id: Uuid, product_id: Uuid) -> Result<Cart, ServiceError> {
        let cart = self
            .update_cart(cart_id, |cart| {
                cart.increment(product_id);
                Ok(())
            })
            .await?;

        info!("Added product {} to cart {}", product_id, cart_id);
        Ok(cart)
    }

    /// Overwrites the quantity of an existing line.
    ///
    /// # Returns
    ///
    /// * `Ok(Cart)` - The cart after the write
    /// * `Err(ServiceError::NotFound)` - The cart or its line for `product_id` is absent
    /// * `Err(ServiceError::Validation)` - `quantity` is not a positive count
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<Cart, ServiceError> {
        let cart = self
            .update_cart(cart_id, |cart| {
                let line = cart
                    .line_mut(product_id)
                    .ok_or_else(|| line_not_found(cart_id, product_id))?;
                line.quantity = parse_quantity(quantity)?;
                Ok(())
            })
            .await?;

        info!(
            "Set quantity of product {} in cart {} to {}",
            product_id, cart_id, quantity
        );
        Ok(cart)
    }

    /// Removes the line for a product.
    ///
    /// Fails with `NotFound` when the cart or the line is absent; nothing is
    /// written in that case.
    #[instrument(skip(self))]
    pub async fn remove_product(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<Cart, ServiceError> {
        let cart = self
            .update_cart(cart_id, |cart| {
                if cart.remove(product_id) {
                    Ok(())
                } else {
                    Err(line_not_found(cart_id, product_id))
                }
            })
            .await?;

        info!("Removed product {} from cart {}", product_id, cart_id);
        Ok(cart)
    }

    /// Empties a cart. The cart itself is kept.
    #[instrument(skip(self))]
    pub async fn clear(&self, cart_id: Uuid) -> Result<Cart, ServiceError> {
        let cart = self
            .update_cart(cart_id, |cart| {
                cart.lines.clear();
                Ok(())
            })
            .await?;

        info!("Cleared cart {}", cart_id);
        Ok(cart)
    }

    /// Deletes a cart entirely and returns it.
    ///
    /// Used to roll back a cart provisioned for a registration that did not
    /// complete.
    #[instrument(skip(self))]
    pub async fn delete(&self, cart_id: Uuid) -> Result<Cart, ServiceError> {
        let removed = self
            .carts
            .mutate(move |carts| carts.shift_remove(&cart_id).ok_or_else(|| cart_not_found(cart_id)))
            .await?;

        info!("Deleted cart {}", cart_id);
        Ok(removed)
    }

    async fn update_cart<F>(&self, cart_id: Uuid, f: F) -> Result<Cart, ServiceError>
    where
        F: FnOnce(&mut Cart) -> Result<(), ServiceError>,
    {
        self.carts
            .mutate(move |carts| {
                let cart = carts.get_mut(&cart_id).ok_or_else(|| cart_not_found(cart_id))?;
                f(cart)?;
                Ok(cart.clone())
            })
            .await
    }
}

fn parse_quantity(quantity: i64) -> Result<u32, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::validation(
            "quantity",
            "quantity must be greater than 0",
        ));
    }
    u32::try_from(quantity)
        .map_err(|_| ServiceError::validation("quantity", "quantity is too large"))
}

fn cart_not_found(cart_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Cart {} not found", cart_id))
}

fn line_not_found(cart_id: Uuid, product_id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!(
        "Product {} not found in cart {}",
        product_id, cart_id
    ))
}
