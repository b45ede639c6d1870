mod lease;
mod memory;
mod shutdown;

pub use lease::PgLeaseLock;
pub use memory::{MemoryLock, MemoryLockBackend};
pub use shutdown::{ShutdownCoordinator, ShutdownReason};
