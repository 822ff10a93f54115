//! Postgres-backed configuration provider over the `configs` table.

use std::time::Duration;

use async_trait::async_trait;
use mediabridge_data::config as data_config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

use crate::error::{ConfigError, ConfigResult};
use crate::provider::ConfigProvider;

/// Reads integration settings from Postgres.
#[derive(Clone)]
pub struct ConfigService {
    pool: PgPool,
}

impl ConfigService {
    /// Establish a connection pool and ensure migrations are applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or migrations fail.
    #[instrument(name = "config_service.new", skip(database_url))]
    pub async fn new(database_url: &str) -> ConfigResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(|source| ConfigError::Database {
                operation: "config_service.connect",
                source,
            })?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub async fn from_pool(pool: PgPool) -> ConfigResult<Self> {
        data_config::run_migrations(&pool)
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "config_service.migrate",
                source,
            })?;
        info!("configuration service ready");
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Store a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn set(&self, key: &str, value: &str) -> ConfigResult<()> {
        data_config::upsert_config_value(&self.pool, key, value)
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "config_service.set",
                source,
            })
    }
}

#[async_trait]
impl ConfigProvider for ConfigService {
    async fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        data_config::fetch_config_value(&self.pool, key)
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "config_service.get",
                source,
            })
    }
}
