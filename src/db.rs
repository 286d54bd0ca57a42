use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::errors::StoreError;
use crate::migrator::Migrator;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            url: config.database_url.clone(),
            max_connections: config.db_max_connections,
            ..Default::default()
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(8),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Establishes a connection pool for the database record stores
pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, StoreError> {
    establish_connection_with_config(&DbConfig::from_app_config(config)).await
}

/// Establishes a connection pool with custom configuration
///
/// In-memory SQLite URLs get a single connection, since every pooled
/// connection would otherwise open its own private database.
pub async fn establish_connection_with_config(
    config: &DbConfig,
) -> Result<DatabaseConnection, StoreError> {
    debug!("Configuring database connection with: {:?}", config);

    let max_connections = if config.url.contains(":memory:") {
        1
    } else {
        config.max_connections
    };

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    info!(max_connections, "Connecting to database");

    Database::connect(opt).await.map_err(|e| {
        error!("Database connection failed: {}", e);
        StoreError::Database(e)
    })
}

/// Applies pending migrations
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), StoreError> {
    info!("Running database migrations");
    Migrator::up(db, None).await.map_err(|e| {
        error!("Migration failed: {}", e);
        StoreError::Database(e)
    })?;
    info!("Migrations completed successfully");
    Ok(())
}
