//! Storefront API Library
//!
//! Product catalog, shopping carts and user registration over pluggable
//! record stores, plus a server-sent feed of catalog changes.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::StoreError;
use crate::events::ProductFeed;
use crate::services::{ServiceContainer, ServiceFactory};
use crate::store::Backend;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: ServiceContainer,
    pub feed: ProductFeed,
}

impl AppState {
    /// Opens the configured backend and loads every collection.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, StoreError> {
        let backend = Backend::from_config(&config).await?;
        Ok(Self::with_backend(config, backend).await)
    }

    /// Builds the state over an already opened backend.
    pub async fn with_backend(config: AppConfig, backend: Backend) -> Self {
        let feed = ProductFeed::new(config.feed_capacity);
        let factory = ServiceFactory::new(
            backend,
            Arc::new(feed.clone()),
            config.persist_timeout(),
        );
        let services = ServiceContainer::new(&factory).await;
        info!(backend = %config.store_backend, "Services initialized");

        Self {
            config: Arc::new(config),
            services,
            feed,
        }
    }
}

/// Every API route, without state
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/products", handlers::commerce::products_routes())
        .nest("/api/carts", handlers::commerce::carts_routes())
        .nest("/api/sessions", handlers::commerce::sessions_routes())
}

/// The routed application with request tracing
pub fn app(state: AppState) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
