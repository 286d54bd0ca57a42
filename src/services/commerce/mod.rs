/// Commerce services module - catalog, carts and user identity
pub mod cart_service;
pub mod identity_service;
pub mod product_catalog_service;

// Re-export services for convenience
pub use cart_service::CartService;
pub use identity_service::{hash_password, verify_password, IdentityService};
pub use product_catalog_service::ProductCatalogService;
