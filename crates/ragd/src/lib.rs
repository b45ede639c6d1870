//! ragd - document server with a cluster-wide progress task.
//!
//! The progress task runs on exactly one node at a time, guarded by a
//! lease-based distributed lock, and stops cooperatively on SIGINT/SIGTERM.

mod runtime;

pub use ragd_core;
pub use ragd_runtime;

pub use runtime::prelude;
pub use runtime::{Ragd, RagdBuilder};
