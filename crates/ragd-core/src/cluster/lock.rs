use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use uuid::Uuid;

use crate::Result;

/// Boxed future returned by lock operations.
pub type LockFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A mutual-exclusion lease shared by every process in the deployment.
///
/// Each handle is bound to one lock name and one holder. A successful
/// `acquire` grants a lease that the backend may reclaim once `timeout`
/// elapses, so holding it is advisory beyond that window.
pub trait DistributedLock: Send + Sync {
    /// Name of the lock shared across the deployment.
    fn name(&self) -> &str;

    /// Try to take the lease for `timeout`. Returns `false` when another
    /// holder owns an unexpired lease.
    fn acquire(&self, timeout: Duration) -> LockFuture<'_, bool>;

    /// Give up the lease held by this handle. A no-op when nothing is held,
    /// including when the lease already expired and was taken over.
    fn release(&self) -> LockFuture<'_, ()>;
}

/// Token identifying one granted lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeaseToken(pub Uuid);

impl LeaseToken {
    /// Mint a fresh token for a new acquisition.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LeaseToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_tokens_are_unique() {
        assert_ne!(LeaseToken::new(), LeaseToken::new());
    }
}
