/// What happened in one pass of a lock-guarded periodic loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The lock was held and the work unit succeeded.
    Completed,
    /// The lock was held and the work unit returned an error.
    Failed(String),
    /// The lock was held and the work unit panicked.
    Panicked(String),
    /// Another holder owns the lock.
    LockNotAcquired,
    /// The lock backend could not be reached.
    LockError(String),
    /// Cancellation was observed before the lock was requested.
    Cancelled,
}

impl IterationOutcome {
    /// Whether the work unit ran in this iteration.
    pub fn ran_work(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Panicked(_))
    }

    /// Whether the lock could not be taken this time around.
    pub fn is_contended(&self) -> bool {
        matches!(self, Self::LockNotAcquired | Self::LockError(_))
    }

    /// Short label for logs and status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
            Self::LockNotAcquired => "lock_not_acquired",
            Self::LockError(_) => "lock_error",
            Self::Cancelled => "cancelled",
        }
    }
}
