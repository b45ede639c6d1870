pub mod cluster;
pub mod db;
pub mod gateway;
pub mod periodic;
pub mod progress;

pub use cluster::{MemoryLock, MemoryLockBackend, PgLeaseLock, ShutdownCoordinator, ShutdownReason};
pub use db::Database;
pub use gateway::{GatewayServer, GatewayState, RouteProvider, RouteRegistry};
pub use periodic::{DistributedPeriodicTask, PeriodicTaskConfig, TaskStats, TaskStatsSnapshot};
pub use progress::{PgProgressStore, ProgressUpdater};
