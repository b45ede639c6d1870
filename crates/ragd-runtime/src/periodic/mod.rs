mod stats;
mod task;

pub use stats::{TaskStats, TaskStatsSnapshot};
pub use task::{DistributedPeriodicTask, PeriodicTaskConfig};
