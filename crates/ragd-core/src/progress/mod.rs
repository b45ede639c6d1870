mod aggregate;
mod status;
mod store;

pub use aggregate::{aggregate_progress, ProgressUpdate, TaskProgress, UnfinishedDocument};
pub use status::RunStatus;
pub use store::{ProgressReport, ProgressStore, StoreFuture};
