use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the lock-guarded progress task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Whether this node runs the progress task at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cluster-wide lock name.
    #[serde(default = "default_lock_name")]
    pub lock_name: String,

    /// Lease timeout of the lock in seconds.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,

    /// Pause between runs in seconds, spent while holding the lock.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Pause after a failed acquisition in milliseconds. Zero retries immediately.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lock_name: default_lock_name(),
            lock_timeout_secs: default_lock_timeout(),
            interval_secs: default_interval(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

impl ProgressConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_true() -> bool {
    true
}

fn default_lock_name() -> String {
    "update_progress".to_string()
}

fn default_lock_timeout() -> u64 {
    60
}

fn default_interval() -> u64 {
    6
}

fn default_retry_backoff() -> u64 {
    500
}

/// Lock backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Which coordination service backs the lock.
    #[serde(default)]
    pub backend: LockBackend,

    /// Lease table name for the PostgreSQL backend.
    #[serde(default = "default_lock_table")]
    pub table: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: LockBackend::default(),
            table: default_lock_table(),
        }
    }
}

fn default_lock_table() -> String {
    "ragd_locks".to_string()
}

/// Coordination service backing the distributed lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    /// Lease rows in PostgreSQL, shared by every node using the same database.
    #[default]
    Postgres,

    /// In-process leases. Only safe for a single process.
    Memory,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Grace period after cancellation before the process exits, in milliseconds.
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period(),
        }
    }
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

fn default_grace_period() -> u64 {
    1000
}
