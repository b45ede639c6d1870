use std::sync::Mutex;
use std::time::Duration;

use ragd_core::cluster::{DistributedLock, LeaseToken, LockFuture, NodeId};
use ragd_core::error::{RagdError, Result};

/// Distributed lock stored as lease rows in PostgreSQL.
///
/// A lease is granted by an upsert that only overwrites an expired row, so
/// at most one holder owns an unexpired lease per name. Release deletes the
/// row only while it still carries this handle's token.
pub struct PgLeaseLock {
    pool: sqlx::PgPool,
    table: String,
    name: String,
    holder: NodeId,
    token: Mutex<Option<LeaseToken>>,
}

impl PgLeaseLock {
    /// Create a new lease lock handle.
    pub fn new(
        pool: sqlx::PgPool,
        table: impl Into<String>,
        name: impl Into<String>,
        holder: NodeId,
    ) -> Self {
        Self {
            pool,
            table: table.into(),
            name: name.into(),
            holder,
            token: Mutex::new(None),
        }
    }

    /// Create the lease table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                name VARCHAR(255) PRIMARY KEY,
                holder UUID NOT NULL,
                token UUID NOT NULL,
                acquired_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            self.table
        );

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| RagdError::Database(format!("Failed to create lease table: {}", e)))?;
        Ok(())
    }

    /// Whether this handle currently believes it holds the lease.
    pub fn is_held(&self) -> bool {
        self.current_token().is_some()
    }

    fn current_token(&self) -> Option<LeaseToken> {
        match self.token.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_token(&self, token: Option<LeaseToken>) {
        match self.token.lock() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    async fn try_acquire(&self, timeout: Duration) -> Result<bool> {
        let token = LeaseToken::new();
        let sql = format!(
            r#"
            INSERT INTO {table} (name, holder, token, acquired_at, expires_at)
            VALUES ($1, $2, $3, NOW(), NOW() + make_interval(secs => $4))
            ON CONFLICT (name) DO UPDATE SET
                holder = EXCLUDED.holder,
                token = EXCLUDED.token,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
            WHERE {table}.expires_at <= NOW()
            "#,
            table = self.table
        );

        let result = sqlx::query(&sql)
            .bind(&self.name)
            .bind(self.holder.as_uuid())
            .bind(token.as_uuid())
            .bind(timeout.as_secs_f64())
            .execute(&self.pool)
            .await
            .map_err(|e| RagdError::Lock(format!("Failed to acquire '{}': {}", self.name, e)))?;

        let acquired = result.rows_affected() > 0;
        if acquired {
            self.set_token(Some(token));
            tracing::debug!(lock = %self.name, token = %token, "Lease acquired");
        }
        Ok(acquired)
    }

    async fn release_held(&self) -> Result<()> {
        let Some(token) = self.current_token() else {
            return Ok(());
        };

        let sql = format!(
            "DELETE FROM {} WHERE name = $1 AND token = $2",
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(&self.name)
            .bind(token.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RagdError::Lock(format!("Failed to release '{}': {}", self.name, e)))?;

        // No matching row means the lease expired and was reclaimed.
        self.set_token(None);

        if result.rows_affected() == 0 {
            tracing::warn!(lock = %self.name, "Lease expired before release");
        } else {
            tracing::debug!(lock = %self.name, token = %token, "Lease released");
        }
        Ok(())
    }
}

impl DistributedLock for PgLeaseLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn acquire(&self, timeout: Duration) -> LockFuture<'_, bool> {
        Box::pin(self.try_acquire(timeout))
    }

    fn release(&self) -> LockFuture<'_, ()> {
        Box::pin(self.release_held())
    }
}
