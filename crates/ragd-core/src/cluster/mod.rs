mod lock;
mod node;

pub use lock::{DistributedLock, LeaseToken, LockFuture};
pub use node::NodeId;
