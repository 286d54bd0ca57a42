use std::sync::Arc;
use std::time::Duration;

use crate::{
    events::ChangeNotifier,
    services::commerce::{CartService, IdentityService, ProductCatalogService},
    store::Backend,
};

/// Factory for creating service instances over one storage backend
pub struct ServiceFactory {
    backend: Backend,
    notifier: Arc<dyn ChangeNotifier>,
    persist_timeout: Duration,
}

impl ServiceFactory {
    /// Creates a new service factory with the given dependencies
    pub fn new(
        backend: Backend,
        notifier: Arc<dyn ChangeNotifier>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            notifier,
            persist_timeout,
        }
    }

    /// Creates a product catalog service, loading its collection
    pub async fn product_catalog_service(&self) -> ProductCatalogService {
        ProductCatalogService::new(
            self.backend.store_for(),
            self.notifier.clone(),
            self.persist_timeout,
        )
        .await
    }

    /// Creates a cart service, loading its collection
    pub async fn cart_service(&self) -> CartService {
        CartService::new(self.backend.store_for(), self.persist_timeout).await
    }

    /// Creates an identity service that provisions carts through `carts`
    pub async fn identity_service(&self, carts: Arc<CartService>) -> IdentityService {
        IdentityService::new(self.backend.store_for(), carts, self.persist_timeout).await
    }

    /// Gets a reference to the storage backend
    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

/// Service container holding all service instances
#[derive(Clone)]
pub struct ServiceContainer {
    pub products: Arc<ProductCatalogService>,
    pub carts: Arc<CartService>,
    pub identity: Arc<IdentityService>,
}

impl ServiceContainer {
    /// Creates a new service container with all services initialized
    pub async fn new(factory: &ServiceFactory) -> Self {
        let products = Arc::new(factory.product_catalog_service().await);
        let carts = Arc::new(factory.cart_service().await);
        let identity = Arc::new(factory.identity_service(carts.clone()).await);

        Self {
            products,
            carts,
            identity,
        }
    }
}
