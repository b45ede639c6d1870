use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ragd_core::task::IterationOutcome;

/// Live counters of a periodic task, shared with the status endpoint.
#[derive(Debug, Default)]
pub struct TaskStats {
    running: AtomicBool,
    holding_lock: AtomicBool,
    lock_attempts: AtomicU64,
    lock_acquisitions: AtomicU64,
    lock_errors: AtomicU64,
    runs: AtomicU64,
    failures: AtomicU64,
    last: Mutex<LastOutcome>,
}

#[derive(Debug, Default, Clone)]
struct LastOutcome {
    success_at: Option<DateTime<Utc>>,
    failure_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// Point-in-time copy of [`TaskStats`].
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatsSnapshot {
    pub running: bool,
    pub holding_lock: bool,
    pub lock_attempts: u64,
    pub lock_acquisitions: u64,
    pub lock_errors: u64,
    pub runs: u64,
    pub failures: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TaskStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_holding_lock(&self) -> bool {
        self.holding_lock.load(Ordering::SeqCst)
    }

    pub fn lock_attempts(&self) -> u64 {
        self.lock_attempts.load(Ordering::SeqCst)
    }

    pub fn lock_acquisitions(&self) -> u64 {
        self.lock_acquisitions.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Mark the loop as started. Returns `false` if it was already running.
    pub(crate) fn start(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_holding_lock(&self, held: bool) {
        self.holding_lock.store(held, Ordering::SeqCst);
    }

    pub(crate) fn record_attempt(&self) {
        self.lock_attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record(&self, outcome: &IterationOutcome) {
        if outcome.ran_work() {
            self.lock_acquisitions.fetch_add(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        match outcome {
            IterationOutcome::Completed => {
                self.last().success_at = Some(Utc::now());
            }
            IterationOutcome::Failed(error) | IterationOutcome::Panicked(error) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                let mut last = self.last();
                last.failure_at = Some(Utc::now());
                last.error = Some(error.clone());
            }
            IterationOutcome::LockError(_) => {
                self.lock_errors.fetch_add(1, Ordering::SeqCst);
            }
            IterationOutcome::LockNotAcquired | IterationOutcome::Cancelled => {}
        }
    }

    pub fn snapshot(&self) -> TaskStatsSnapshot {
        let last = self.last().clone();
        TaskStatsSnapshot {
            running: self.is_running(),
            holding_lock: self.is_holding_lock(),
            lock_attempts: self.lock_attempts(),
            lock_acquisitions: self.lock_acquisitions(),
            lock_errors: self.lock_errors.load(Ordering::SeqCst),
            runs: self.runs(),
            failures: self.failures(),
            last_success_at: last.success_at,
            last_failure_at: last.failure_at,
            last_error: last.error,
        }
    }

    fn last(&self) -> std::sync::MutexGuard<'_, LastOutcome> {
        match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
