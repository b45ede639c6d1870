use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use ragd_core::config::DatabaseConfig;
use ragd_core::error::{RagdError, Result};

/// Database connection wrapper providing connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection from configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| RagdError::Database(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
