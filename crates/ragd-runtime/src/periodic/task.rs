use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use ragd_core::cluster::DistributedLock;
use ragd_core::config::ProgressConfig;
use ragd_core::task::{IterationOutcome, WorkUnit};

use super::stats::TaskStats;

/// Timing of a lock-guarded periodic task.
#[derive(Debug, Clone)]
pub struct PeriodicTaskConfig {
    /// Lease timeout requested on every acquisition.
    pub lock_timeout: Duration,
    /// Pause after each run, spent while still holding the lock.
    pub interval: Duration,
    /// Pause after a failed acquisition. Zero retries immediately.
    pub retry_backoff: Duration,
}

impl Default for PeriodicTaskConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(60),
            interval: Duration::from_secs(6),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&ProgressConfig> for PeriodicTaskConfig {
    fn from(config: &ProgressConfig) -> Self {
        Self {
            lock_timeout: config.lock_timeout(),
            interval: config.interval(),
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Runs a work unit on a fixed cadence on at most one node at a time.
///
/// Every iteration takes the distributed lock, runs the work unit, waits
/// out the interval and releases the lock again. Work failures and panics
/// are logged and the loop carries on; contention and lock-service errors
/// are retried. The loop ends once the cancellation token fires.
pub struct DistributedPeriodicTask {
    lock: Arc<dyn DistributedLock>,
    work: Arc<dyn WorkUnit>,
    config: PeriodicTaskConfig,
    shutdown: CancellationToken,
    stats: Arc<TaskStats>,
}

impl DistributedPeriodicTask {
    /// Create a new periodic task.
    pub fn new(
        lock: Arc<dyn DistributedLock>,
        work: Arc<dyn WorkUnit>,
        config: PeriodicTaskConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            lock,
            work,
            config,
            shutdown,
            stats: Arc::new(TaskStats::new()),
        }
    }

    /// Shared counters for status reporting.
    pub fn stats(&self) -> Arc<TaskStats> {
        self.stats.clone()
    }

    pub fn config(&self) -> &PeriodicTaskConfig {
        &self.config
    }

    /// Run until the cancellation token fires.
    ///
    /// Calling `run` while the same task is already running returns
    /// immediately.
    pub async fn run(&self) {
        if !self.stats.start() {
            tracing::warn!(task = self.work.name(), "Periodic task already running");
            return;
        }

        tracing::info!(
            task = self.work.name(),
            lock = self.lock.name(),
            lock_timeout = ?self.config.lock_timeout,
            interval = ?self.config.interval,
            "Periodic task started"
        );

        while !self.shutdown.is_cancelled() {
            let outcome = self.run_once().await;
            if outcome.is_contended() {
                self.backoff().await;
            }
        }

        self.stats.stop();
        tracing::info!(task = self.work.name(), "Periodic task stopped");
    }

    /// One acquire, run, wait, release cycle.
    pub async fn run_once(&self) -> IterationOutcome {
        let outcome = self.cycle().await;
        self.stats.record(&outcome);
        tracing::trace!(task = self.work.name(), outcome = outcome.as_str(), "Iteration finished");
        outcome
    }

    async fn cycle(&self) -> IterationOutcome {
        if self.shutdown.is_cancelled() {
            return IterationOutcome::Cancelled;
        }

        self.stats.record_attempt();
        match self.lock.acquire(self.config.lock_timeout).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::trace!(lock = self.lock.name(), "Lock held elsewhere");
                return IterationOutcome::LockNotAcquired;
            }
            Err(e) => {
                tracing::warn!(lock = self.lock.name(), error = %e, "Lock acquisition failed");
                return IterationOutcome::LockError(e.to_string());
            }
        }
        self.stats.set_holding_lock(true);

        let outcome = self.execute().await;
        self.pause(self.config.interval).await;

        if let Err(e) = self.lock.release().await {
            tracing::warn!(lock = self.lock.name(), error = %e, "Lock release failed");
        }
        self.stats.set_holding_lock(false);

        outcome
    }

    async fn execute(&self) -> IterationOutcome {
        let name = self.work.name();
        match AssertUnwindSafe(self.work.execute()).catch_unwind().await {
            Ok(Ok(())) => {
                tracing::debug!(task = name, "Work unit completed");
                IterationOutcome::Completed
            }
            Ok(Err(e)) => {
                tracing::error!(task = name, error = %e, "Work unit failed");
                IterationOutcome::Failed(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(task = name, panic = %message, "Work unit panicked");
                IterationOutcome::Panicked(message)
            }
        }
    }

    async fn backoff(&self) {
        if self.config.retry_backoff.is_zero() {
            tokio::task::yield_now().await;
        } else {
            self.pause(self.config.retry_backoff).await;
        }
    }

    /// Sleep for `duration`, waking early on cancellation.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
