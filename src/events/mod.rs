use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::Product;

/// Wire name of the full-catalog snapshot sent to a newly connected observer.
pub const PRODUCTS_EVENT: &str = "products";
/// Wire name of the event emitted after a product has been persisted.
pub const PRODUCT_CREATED_EVENT: &str = "product-created";

/// Catalog change pushed to connected observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEvent {
    ProductsSnapshot(Vec<Product>),
    ProductCreated(Product),
}

impl CatalogEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CatalogEvent::ProductsSnapshot(_) => PRODUCTS_EVENT,
            CatalogEvent::ProductCreated(_) => PRODUCT_CREATED_EVENT,
        }
    }
}

/// Outbound port the catalog uses to announce changes.
///
/// Called only after the change is durable. Implementations log delivery
/// problems themselves; `publish` cannot fail.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn publish(&self, event: CatalogEvent);
}

/// Fan-out of catalog events to every subscribed observer.
#[derive(Debug, Clone)]
pub struct ProductFeed {
    sender: broadcast::Sender<CatalogEvent>,
}

impl ProductFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl ChangeNotifier for ProductFeed {
    async fn publish(&self, event: CatalogEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(observers) => debug!(event = name, observers, "Published catalog event"),
            Err(_) => debug!(event = name, "No observers connected; event dropped"),
        }
    }
}
