/// Commerce API handlers module
pub mod carts;
pub mod product_feed;
pub mod products;
pub mod sessions;

// Re-export route builders
pub use carts::carts_routes;
pub use products::products_routes;
pub use sessions::sessions_routes;
