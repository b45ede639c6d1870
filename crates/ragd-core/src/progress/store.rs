use std::future::Future;
use std::pin::Pin;

use super::aggregate::{ProgressUpdate, TaskProgress, UnfinishedDocument};
use crate::Result;

/// Boxed future returned by progress store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// External store holding documents and their parsing tasks.
pub trait ProgressStore: Send + Sync {
    /// Documents that are enabled and partway through parsing.
    fn unfinished_documents(&self) -> StoreFuture<'_, Vec<UnfinishedDocument>>;

    /// Tasks of one document in creation order.
    fn document_tasks<'a>(&'a self, doc_id: &'a str) -> StoreFuture<'a, Vec<TaskProgress>>;

    /// Write the aggregated progress of one document.
    fn apply_update<'a>(&'a self, doc_id: &'a str, update: &'a ProgressUpdate)
        -> StoreFuture<'a, ()>;
}

/// Summary of one progress pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressReport {
    /// Documents looked at.
    pub scanned: usize,
    /// Documents whose progress was written.
    pub updated: usize,
    /// Documents that reached `Done` or `Fail`.
    pub finished: usize,
    /// Documents skipped because reading or writing them failed.
    pub failed_documents: usize,
}
