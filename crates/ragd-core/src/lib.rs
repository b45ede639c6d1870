pub mod cluster;
pub mod config;
pub mod error;
pub mod progress;
pub mod task;

pub use cluster::{DistributedLock, LeaseToken, NodeId};
pub use config::RagdConfig;
pub use error::{RagdError, Result};
pub use progress::{ProgressStore, ProgressUpdate, RunStatus, TaskProgress};
pub use task::{IterationOutcome, WorkUnit};
