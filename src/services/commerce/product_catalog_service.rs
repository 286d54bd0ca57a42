use crate::{
    errors::ServiceError,
    events::{CatalogEvent, ChangeNotifier},
    models::{NewProduct, Page, PageRequest, Product, ProductPatch},
    store::{Collection, RecordStore},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Product catalog service: owns the product collection and its invariants.
///
/// Product codes are unique at every point in time, ids are never
/// reassigned, and every accepted change is durable before it is reported.
#[derive(Clone)]
pub struct ProductCatalogService {
    products: Arc<Collection<Product>>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl ProductCatalogService {
    /// Loads the catalog from `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Record store holding the products
    /// * `notifier` - Port receiving `product-created` events
    /// * `persist_timeout` - Bound on every write to `store`
    pub async fn new(
        store: Arc<dyn RecordStore<Product>>,
        notifier: Arc<dyn ChangeNotifier>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            products: Arc::new(Collection::load(store, persist_timeout).await),
            notifier,
        }
    }

    /// Lists one page of products in creation order.
    ///
    /// A page past the end returns no items together with accurate page
    /// metadata.
    #[instrument(skip(self))]
    pub async fn list_all(&self, request: PageRequest) -> Result<Page<Product>, ServiceError> {
        Ok(self
            .products
            .read(|products| Page::from_listing(products.values(), request))
            .await)
    }

    /// Every product in creation order.
    pub async fn all(&self) -> Vec<Product> {
        self.products.all().await
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, product_id: Uuid) -> Result<Product, ServiceError> {
        self.products
            .get(product_id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Creates a product.
    ///
    /// # Returns
    ///
    /// * `Ok(Product)` - The persisted product with a fresh id
    /// * `Err(ServiceError::Validation)` - A field breaks its rule; names the field
    /// * `Err(ServiceError::DuplicateCode)` - Another product already uses `code`
    /// * `Err(ServiceError::Store)` - The store rejected the write; nothing changed
    ///
    /// A `product-created` event is published only after the write succeeds.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: NewProduct) -> Result<Product, ServiceError> {
        input.validate()?;

        let product = input.into_product(Uuid::new_v4());
        let created = product.clone();

        self.products
            .mutate(move |products| {
                ensure_unique_code(products.values(), &product.code, None)?;
                products.insert(product.id, product);
                Ok(())
            })
            .await?;

        info!(product_id = %created.id, "Created product");

        self.notifier
            .publish(CatalogEvent::ProductCreated(created.clone()))
            .await;

        Ok(created)
    }

    /// Applies the fields present in `patch`; absent fields keep their value.
    ///
    /// # Returns
    ///
    /// * `Ok(Product)` - The updated product
    /// * `Err(ServiceError::NotFound)` - No product with `product_id`
    /// * `Err(ServiceError::ImmutableField)` - `patch.id` names a different id
    /// * `Err(ServiceError::Validation)` - A present field breaks its rule
    /// * `Err(ServiceError::DuplicateCode)` - The new code belongs to another product
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        product_id: Uuid,
        patch: ProductPatch,
    ) -> Result<Product, ServiceError> {
        let updated = self
            .products
            .mutate(move |products| {
                if !products.contains_key(&product_id) {
                    return Err(ServiceError::NotFound(format!(
                        "Product {} not found",
                        product_id
                    )));
                }
                if patch.id.is_some_and(|id| id != product_id) {
                    return Err(ServiceError::ImmutableField("id".to_string()));
                }
                patch.validate()?;
                if let Some(code) = patch.code.as_deref() {
                    ensure_unique_code(products.values(), code, Some(product_id))?;
                }

                let product = products.get_mut(&product_id).ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", product_id))
                })?;
                patch.apply_to(product);
                Ok(product.clone())
            })
            .await?;

        info!("Updated product: {}", product_id);
        Ok(updated)
    }

    /// Removes a product and returns it.
    ///
    /// Carts that reference the product are left untouched; readers resolve
    /// such lines as unknown products.
    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: Uuid) -> Result<Product, ServiceError> {
        let removed = self
            .products
            .mutate(move |products| {
                products.shift_remove(&product_id).ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", product_id))
                })
            })
            .await?;

        info!("Deleted product: {}", product_id);
        Ok(removed)
    }
}

fn ensure_unique_code<'a>(
    mut products: impl Iterator<Item = &'a Product>,
    code: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    if products.any(|p| p.code == code && Some(p.id) != except) {
        return Err(ServiceError::DuplicateCode(code.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ProductFeed;
    use crate::store::collection::testing::MemoryStore;
    use assert_matches::assert_matches;

    fn input(code: &str) -> NewProduct {
        NewProduct {
            title: "A".into(),
            description: "first product".into(),
            code: code.into(),
            price: 10.0,
            stock: 5,
            category: "c".into(),
            status: None,
            thumbnails: vec![],
        }
    }

    async fn service() -> (ProductCatalogService, Arc<MemoryStore<Product>>, ProductFeed) {
        let store = Arc::new(MemoryStore::<Product>::new(vec![]));
        let feed = ProductFeed::new(16);
        let service = ProductCatalogService::new(
            store.clone(),
            Arc::new(feed.clone()),
            Duration::from_millis(500),
        )
        .await;
        (service, store, feed)
    }

    #[tokio::test]
    async fn duplicate_code_leaves_collection_unchanged() {
        let (service, store, _) = service().await;
        service.create(input("X1")).await.unwrap();
        let writes = store.writes();

        let err = service.create(input("X1")).await.unwrap_err();
        assert_matches!(err, ServiceError::DuplicateCode(code) if code == "X1");
        assert_eq!(store.writes(), writes);
        assert_eq!(service.all().await.len(), 1);
    }

    #[tokio::test]
    async fn codes_compare_case_sensitively() {
        let (service, _, _) = service().await;
        service.create(input("x1")).await.unwrap();
        assert!(service.create(input("X1")).await.is_ok());
    }

    #[tokio::test]
    async fn created_event_follows_successful_persist() {
        let (service, store, feed) = service().await;
        let mut observer = feed.subscribe();

        let product = service.create(input("X1")).await.unwrap();
        assert_eq!(
            observer.try_recv().unwrap(),
            CatalogEvent::ProductCreated(product)
        );

        store.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(service.create(input("X2")).await.is_err());
        assert!(observer.try_recv().is_err());
        assert_eq!(service.all().await.len(), 1);
    }

    #[tokio::test]
    async fn list_all_pages_in_creation_order() {
        let (service, _, _) = service().await;
        let mut created = Vec::new();
        for i in 0..7 {
            created.push(service.create(input(&format!("P{i}"))).await.unwrap());
        }

        let page = service
            .list_all(PageRequest::new(2, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(page.items, created[3..6].to_vec());
        assert_eq!(page.total_items, 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev && page.has_next);

        let past_end = service
            .list_all(PageRequest::new(9, 3).unwrap())
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_pages, 3);
    }

    #[tokio::test]
    async fn update_rejects_changing_id() {
        let (service, _, _) = service().await;
        let product = service.create(input("X1")).await.unwrap();

        let patch = ProductPatch {
            id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert_matches!(
            service.update(product.id, patch).await,
            Err(ServiceError::ImmutableField(field)) if field == "id"
        );

        let same_id = ProductPatch {
            id: Some(product.id),
            title: Some("B".into()),
            ..Default::default()
        };
        assert_eq!(service.update(product.id, same_id).await.unwrap().title, "B");
    }

    #[tokio::test]
    async fn update_rejects_code_of_another_product() {
        let (service, _, _) = service().await;
        let first = service.create(input("X1")).await.unwrap();
        service.create(input("X2")).await.unwrap();

        let patch = ProductPatch {
            code: Some("X2".into()),
            ..Default::default()
        };
        assert_matches!(
            service.update(first.id, patch).await,
            Err(ServiceError::DuplicateCode(_))
        );

        let keep_own_code = ProductPatch {
            code: Some("X1".into()),
            ..Default::default()
        };
        assert!(service.update(first.id, keep_own_code).await.is_ok());
    }

    #[tokio::test]
    async fn update_validates_present_fields() {
        let (service, _, _) = service().await;
        let product = service.create(input("X1")).await.unwrap();

        let patch = ProductPatch {
            price: Some(0.0),
            ..Default::default()
        };
        assert_matches!(
            service.update(product.id, patch).await,
            Err(ServiceError::Validation { field, .. }) if field == "price"
        );
        assert_eq!(service.get_by_id(product.id).await.unwrap(), product);
    }

    #[tokio::test]
    async fn update_of_missing_product_is_not_found_before_validation() {
        let (service, store, _) = service().await;
        let patch = ProductPatch {
            id: Some(Uuid::new_v4()),
            price: Some(-1.0),
            ..Default::default()
        };
        assert_matches!(
            service.update(Uuid::new_v4(), patch).await,
            Err(ServiceError::NotFound(_))
        );
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn delete_of_missing_product_is_not_found() {
        let (service, store, _) = service().await;
        assert_matches!(
            service.delete(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
        assert_eq!(store.writes(), 0);
    }
}
