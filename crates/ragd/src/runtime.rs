//! ragd runtime.
//!
//! Wires configuration, the database pool, the distributed lock, the
//! progress task, the HTTP gateway and signal handling into one process.

use std::sync::Arc;

use tokio::task::JoinSet;

use ragd_core::cluster::{DistributedLock, NodeId};
use ragd_core::config::{LockBackend, RagdConfig};
use ragd_core::error::{RagdError, Result};
use ragd_core::progress::ProgressStore;

use ragd_runtime::cluster::{
    MemoryLockBackend, PgLeaseLock, ShutdownCoordinator, ShutdownReason,
};
use ragd_runtime::db::Database;
use ragd_runtime::gateway::{
    GatewayServer, GatewayState, RouteProvider, RouteRegistry, SYSTEM_ROUTES,
};
use ragd_runtime::periodic::{DistributedPeriodicTask, PeriodicTaskConfig};
use ragd_runtime::progress::{PgProgressStore, ProgressUpdater};

/// Prelude module for common imports.
pub mod prelude {
    pub use ragd_core::cluster::{DistributedLock, NodeId};
    pub use ragd_core::config::RagdConfig;
    pub use ragd_core::error::{RagdError, Result};
    pub use ragd_core::progress::ProgressStore;
    pub use ragd_core::task::{IterationOutcome, WorkUnit};
    pub use ragd_runtime::gateway::{GatewayState, RouteProvider};

    pub use crate::{Ragd, RagdBuilder};
}

/// The main ragd runtime.
pub struct Ragd {
    config: RagdConfig,
    node_id: NodeId,
    routes: RouteRegistry,
    lock: Option<Arc<dyn DistributedLock>>,
    store: Option<Arc<dyn ProgressStore>>,
    shutdown: ShutdownCoordinator,
}

impl Ragd {
    /// Create a new builder for configuring ragd.
    pub fn builder() -> RagdBuilder {
        RagdBuilder::new()
    }

    /// Get the node ID.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Get the configuration.
    pub fn config(&self) -> &RagdConfig {
        &self.config
    }

    /// Handle for requesting shutdown from outside `run`.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    fn needs_database(&self) -> bool {
        if !self.config.progress.enabled {
            return false;
        }
        let pg_lock = self.lock.is_none() && self.config.lock.backend == LockBackend::Postgres;
        self.store.is_none() || pg_lock
    }

    async fn build_lock(&self, db: Option<&Database>) -> Result<Arc<dyn DistributedLock>> {
        if let Some(lock) = &self.lock {
            return Ok(lock.clone());
        }

        let name = self.config.progress.lock_name.clone();
        match self.config.lock.backend {
            LockBackend::Postgres => {
                let db = db.ok_or_else(|| {
                    RagdError::Internal("Postgres lock requires a database".to_string())
                })?;
                let lock = PgLeaseLock::new(
                    db.pool().clone(),
                    self.config.lock.table.clone(),
                    name,
                    self.node_id,
                );
                lock.ensure_table().await?;
                Ok(Arc::new(lock))
            }
            LockBackend::Memory => {
                tracing::warn!("Using in-process lock; progress ownership is not shared across nodes");
                Ok(Arc::new(MemoryLockBackend::new().lock(name, self.node_id)))
            }
        }
    }

    fn build_store(&self, db: Option<&Database>) -> Result<Arc<dyn ProgressStore>> {
        if let Some(store) = &self.store {
            return Ok(store.clone());
        }
        let db = db.ok_or_else(|| {
            RagdError::Internal("Progress store requires a database".to_string())
        })?;
        Ok(Arc::new(PgProgressStore::new(db.pool().clone())))
    }

    /// Run the ragd server until a shutdown signal arrives.
    ///
    /// After the signal, the gateway and the progress task share one grace
    /// period to finish and are aborted once it elapses.
    ///
    /// Returns an error only for fatal startup failures. In that case the
    /// shutdown token has already been cancelled and the grace period has
    /// elapsed, and the caller is expected to exit without further cleanup.
    pub async fn run(self) -> Result<()> {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::info!(
            project = %self.config.project.name,
            node_id = %self.node_id,
            hostname = %hostname,
            "ragd runtime starting"
        );

        let db = if self.needs_database() {
            let db = Database::from_config(&self.config.database).await?;
            tracing::info!(url = %self.config.database.redacted_url(), "Connected to database");
            Some(db)
        } else {
            None
        };

        let signals = self.shutdown.install_signal_handlers();
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        // The progress task starts before the gateway binds.
        let stats = if self.config.progress.enabled {
            let lock = self.build_lock(db.as_ref()).await?;
            let store = self.build_store(db.as_ref())?;
            let task = DistributedPeriodicTask::new(
                lock,
                Arc::new(ProgressUpdater::new(store)),
                PeriodicTaskConfig::from(&self.config.progress),
                self.shutdown.token(),
            );
            let stats = task.stats();
            tasks.spawn(async move {
                task.run().await;
                Ok(())
            });
            Some(stats)
        } else {
            tracing::info!("Progress task disabled");
            None
        };

        let state = GatewayState {
            node_id: self.node_id,
            lock_name: self.config.progress.lock_name.clone(),
            progress: stats,
        };
        let gateway = GatewayServer::new(self.config.gateway.clone(), self.routes, state);

        let listener = match gateway.bind().await {
            Ok(listener) => listener,
            Err(e) => return fatal(&self.shutdown, e).await,
        };
        tasks.spawn(gateway.serve(listener, self.shutdown.token()));

        // Both tasks only stop on their own once the token is cancelled.
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {}
            Some(joined) = tasks.join_next() => {
                let err = match joined {
                    Ok(Err(e)) => e,
                    Ok(Ok(())) => RagdError::Internal("Background task stopped unexpectedly".to_string()),
                    Err(e) => RagdError::Internal(format!("Background task failed: {}", e)),
                };
                return fatal(&self.shutdown, err).await;
            }
        }

        tracing::info!(
            reason = self.shutdown.reason().map(|r| r.as_str()).unwrap_or("unknown"),
            "Starting graceful shutdown"
        );

        let drained = self.shutdown.drain(&mut tasks).await;
        signals.abort();

        if drained {
            if let Some(db) = db {
                db.close().await;
            }
        }

        tracing::info!("ragd runtime stopped");
        Ok(())
    }
}

/// Log a fatal error, cancel everything and wait out the grace period.
async fn fatal(shutdown: &ShutdownCoordinator, err: RagdError) -> Result<()> {
    tracing::error!(error = %err, "Fatal error, shutting down");
    shutdown.trigger(ShutdownReason::Fatal);
    tokio::time::sleep(shutdown.grace_period()).await;
    Err(err)
}

/// Builder for configuring the ragd runtime.
pub struct RagdBuilder {
    config: Option<RagdConfig>,
    node_id: Option<NodeId>,
    providers: Vec<RouteProvider>,
    lock: Option<Arc<dyn DistributedLock>>,
    store: Option<Arc<dyn ProgressStore>>,
}

impl RagdBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            node_id: None,
            providers: vec![SYSTEM_ROUTES],
            lock: None,
            store: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: RagdConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a fixed node id instead of a random one.
    pub fn node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// Mount an additional route provider.
    pub fn routes(mut self, provider: RouteProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Use this lock instead of the configured backend.
    pub fn lock(mut self, lock: Arc<dyn DistributedLock>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Use this progress store instead of PostgreSQL.
    pub fn progress_store(mut self, store: Arc<dyn ProgressStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the ragd runtime.
    pub fn build(self) -> Result<Ragd> {
        let config = self
            .config
            .ok_or_else(|| RagdError::Config("Configuration is required".to_string()))?;
        config.validate()?;

        let routes = RouteRegistry::from_providers(&self.providers)?;
        let shutdown = ShutdownCoordinator::new(config.shutdown.grace_period());

        Ok(Ragd {
            config,
            node_id: self.node_id.unwrap_or_default(),
            routes,
            lock: self.lock,
            store: self.store,
            shutdown,
        })
    }
}

impl Default for RagdBuilder {
    fn default() -> Self {
        Self::new()
    }
}
