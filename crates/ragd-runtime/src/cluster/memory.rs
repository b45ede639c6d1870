use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use ragd_core::cluster::{DistributedLock, LeaseToken, LockFuture, NodeId};

#[derive(Debug, Clone, Copy)]
struct Lease {
    holder: NodeId,
    token: LeaseToken,
    expires_at: Instant,
}

/// In-process lease table.
///
/// Every [`MemoryLock`] created from the same backend competes for the same
/// leases, which makes it a stand-in for a shared coordination service in a
/// single process.
#[derive(Clone, Default)]
pub struct MemoryLockBackend {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
}

impl MemoryLockBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lock handle for `name` owned by `holder`.
    pub fn lock(&self, name: impl Into<String>, holder: NodeId) -> MemoryLock {
        MemoryLock {
            backend: self.clone(),
            name: name.into(),
            holder,
            token: Mutex::new(None),
        }
    }

    /// Holder of the unexpired lease on `name`, if any.
    pub fn holder(&self, name: &str) -> Option<NodeId> {
        let now = Instant::now();
        self.leases()
            .get(name)
            .filter(|lease| lease.expires_at > now)
            .map(|lease| lease.holder)
    }

    fn leases(&self) -> MutexGuard<'_, HashMap<String, Lease>> {
        match self.leases.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn try_acquire(&self, name: &str, holder: NodeId, timeout: Duration) -> Option<LeaseToken> {
        let now = Instant::now();
        let mut leases = self.leases();

        if let Some(existing) = leases.get(name) {
            if existing.expires_at > now {
                return None;
            }
        }

        let token = LeaseToken::new();
        leases.insert(
            name.to_string(),
            Lease {
                holder,
                token,
                expires_at: now + timeout,
            },
        );
        Some(token)
    }

    fn release(&self, name: &str, token: LeaseToken) -> bool {
        let mut leases = self.leases();
        match leases.get(name) {
            Some(lease) if lease.token == token => {
                leases.remove(name);
                true
            }
            _ => false,
        }
    }
}

/// Lock handle backed by a [`MemoryLockBackend`].
pub struct MemoryLock {
    backend: MemoryLockBackend,
    name: String,
    holder: NodeId,
    token: Mutex<Option<LeaseToken>>,
}

impl MemoryLock {
    /// Whether this handle currently believes it holds the lease.
    pub fn is_held(&self) -> bool {
        self.token_slot().is_some()
    }

    fn token_slot(&self) -> MutexGuard<'_, Option<LeaseToken>> {
        match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl DistributedLock for MemoryLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn acquire(&self, timeout: Duration) -> LockFuture<'_, bool> {
        let granted = self.backend.try_acquire(&self.name, self.holder, timeout);
        let acquired = granted.is_some();
        if granted.is_some() {
            *self.token_slot() = granted;
        }
        Box::pin(async move { Ok(acquired) })
    }

    fn release(&self) -> LockFuture<'_, ()> {
        if let Some(token) = self.token_slot().take() {
            if !self.backend.release(&self.name, token) {
                tracing::warn!(lock = %self.name, "Lease expired before release");
            }
        }
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_holder() {
        let backend = MemoryLockBackend::new();
        let a = backend.lock("update_progress", NodeId::new());
        let b = backend.lock("update_progress", NodeId::new());

        assert!(a.acquire(Duration::from_secs(60)).await.unwrap());
        assert!(!b.acquire(Duration::from_secs(60)).await.unwrap());

        a.release().await.unwrap();
        assert!(b.acquire(Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_names_are_independent() {
        let backend = MemoryLockBackend::new();
        let node = NodeId::new();
        let progress = backend.lock("update_progress", node);
        let other = backend.lock("reindex", node);

        assert!(progress.acquire(Duration::from_secs(60)).await.unwrap());
        assert!(other.acquire(Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_without_acquire_is_noop() {
        let backend = MemoryLockBackend::new();
        let a = backend.lock("update_progress", NodeId::new());
        let b = backend.lock("update_progress", NodeId::new());

        assert!(a.acquire(Duration::from_secs(60)).await.unwrap());
        b.release().await.unwrap();
        b.release().await.unwrap();

        assert!(a.is_held());
        assert!(backend.holder("update_progress").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_is_reclaimed() {
        let backend = MemoryLockBackend::new();
        let first = NodeId::new();
        let second = NodeId::new();
        let a = backend.lock("update_progress", first);
        let b = backend.lock("update_progress", second);

        assert!(a.acquire(Duration::from_secs(60)).await.unwrap());
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(backend.holder("update_progress").is_none());
        assert!(b.acquire(Duration::from_secs(60)).await.unwrap());
        assert_eq!(backend.holder("update_progress"), Some(second));

        // The stale handle must not delete the new owner's lease.
        a.release().await.unwrap();
        assert_eq!(backend.holder("update_progress"), Some(second));
        assert!(!a.is_held());
    }
}
