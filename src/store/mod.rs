//! Durable keyed-record persistence.
//!
//! A [`RecordStore`] persists one entity collection as a whole. Two media
//! implement it: [`FileRecordStore`] (a JSON array per collection) and
//! [`DatabaseRecordStore`] (one row per record). Services only ever see
//! `Arc<dyn RecordStore<T>>`, obtained from a [`Backend`], and wrap it in a
//! [`Collection`] that serialises read-modify-write cycles.

pub mod collection;
pub mod database;
pub mod file;

pub use collection::Collection;
pub use database::DatabaseRecordStore;
pub use file::FileRecordStore;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::{AppConfig, StoreBackend};
use crate::errors::StoreError;
use crate::models::{Cart, Product, User};

/// An entity that can live in a record store.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name; also the file stem and the database partition key.
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;

    /// Value covered by the database store's unique index, if any.
    fn unique_key(&self) -> Option<&str> {
        None
    }
}

impl Record for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.code)
    }
}

impl Record for Cart {
    const COLLECTION: &'static str = "carts";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.username)
    }
}

/// Persistence medium for a single collection.
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    /// Loads every record in stored order. Never fails: a missing or
    /// unreadable medium yields an empty collection and a log entry.
    async fn load_all(&self) -> Vec<T>;

    /// Durably replaces the stored collection with `records`.
    async fn persist(&self, records: &[T]) -> Result<(), StoreError>;
}

/// Selected persistence medium, shared by all collections.
#[derive(Clone)]
pub enum Backend {
    File { dir: PathBuf },
    Database(Arc<DatabaseConnection>),
}

impl Backend {
    /// Opens the medium named by the configuration. For the database
    /// backend this connects and applies migrations.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match config.store_backend {
            StoreBackend::File => {
                info!(dir = %config.data_dir, "Using file-backed record stores");
                Ok(Backend::File {
                    dir: PathBuf::from(&config.data_dir),
                })
            }
            StoreBackend::Database => {
                let conn = crate::db::establish_connection(config).await?;
                crate::db::run_migrations(&conn).await?;
                info!("Using database-backed record stores");
                Ok(Backend::Database(Arc::new(conn)))
            }
        }
    }

    pub fn store_for<T: Record>(&self) -> Arc<dyn RecordStore<T>> {
        match self {
            Backend::File { dir } => Arc::new(FileRecordStore::<T>::in_dir(dir)),
            Backend::Database(conn) => Arc::new(DatabaseRecordStore::<T>::new(conn.clone())),
        }
    }
}
