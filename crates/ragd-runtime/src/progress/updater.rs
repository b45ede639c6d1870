use std::sync::Arc;

use chrono::Utc;

use ragd_core::error::Result;
use ragd_core::progress::{aggregate_progress, ProgressReport, ProgressStore, UnfinishedDocument};
use ragd_core::task::{WorkFuture, WorkUnit};

/// Work unit that folds task progress into document progress.
pub struct ProgressUpdater {
    store: Arc<dyn ProgressStore>,
}

impl ProgressUpdater {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Run one pass over all unfinished documents.
    ///
    /// Only failing to list documents fails the pass; a document that
    /// cannot be read or written is logged and skipped.
    pub async fn update_progress(&self) -> Result<ProgressReport> {
        let documents = self.store.unfinished_documents().await?;
        let mut report = ProgressReport {
            scanned: documents.len(),
            ..Default::default()
        };

        for doc in &documents {
            match self.update_document(doc).await {
                Ok(Some(finished)) => {
                    report.updated += 1;
                    if finished {
                        report.finished += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed_documents += 1;
                    tracing::error!(doc_id = %doc.id, error = %e, "Failed to update document progress");
                }
            }
        }

        if report.updated > 0 || report.failed_documents > 0 {
            tracing::info!(
                scanned = report.scanned,
                updated = report.updated,
                finished = report.finished,
                failed = report.failed_documents,
                "Document progress updated"
            );
        }

        Ok(report)
    }

    /// Returns whether the document finished, or `None` if nothing was written.
    async fn update_document(&self, doc: &UnfinishedDocument) -> Result<Option<bool>> {
        let tasks = self.store.document_tasks(&doc.id).await?;
        let Some(update) = aggregate_progress(doc, &tasks, Utc::now()) else {
            return Ok(None);
        };

        self.store.apply_update(&doc.id, &update).await?;
        if update.is_finished() {
            tracing::debug!(doc_id = %doc.id, run = %update.run, "Document processing finished");
        }
        Ok(Some(update.is_finished()))
    }
}

impl WorkUnit for ProgressUpdater {
    fn name(&self) -> &str {
        "update_progress"
    }

    fn execute(&self) -> WorkFuture<'_> {
        Box::pin(async move {
            self.update_progress().await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use ragd_core::progress::{ProgressUpdate, RunStatus, StoreFuture, TaskProgress};
    use ragd_core::RagdError;

    #[derive(Default)]
    struct MemoryStore {
        documents: Vec<UnfinishedDocument>,
        tasks: HashMap<String, Vec<TaskProgress>>,
        broken_docs: Vec<String>,
        list_fails: bool,
        written: Mutex<Vec<(String, ProgressUpdate)>>,
    }

    impl MemoryStore {
        fn with_doc(mut self, id: &str, tasks: Vec<TaskProgress>) -> Self {
            self.documents.push(UnfinishedDocument {
                id: id.to_string(),
                run: RunStatus::Running,
                process_begin_at: Some(Utc::now()),
            });
            self.tasks.insert(id.to_string(), tasks);
            self
        }

        fn written(&self) -> Vec<(String, ProgressUpdate)> {
            self.written.lock().unwrap().clone()
        }
    }

    impl ProgressStore for MemoryStore {
        fn unfinished_documents(&self) -> StoreFuture<'_, Vec<UnfinishedDocument>> {
            let result = if self.list_fails {
                Err(RagdError::Database("connection refused".to_string()))
            } else {
                Ok(self.documents.clone())
            };
            Box::pin(async move { result })
        }

        fn document_tasks<'a>(&'a self, doc_id: &'a str) -> StoreFuture<'a, Vec<TaskProgress>> {
            let result = if self.broken_docs.iter().any(|d| d == doc_id) {
                Err(RagdError::Database(format!("task rows for {} unreadable", doc_id)))
            } else {
                Ok(self.tasks.get(doc_id).cloned().unwrap_or_default())
            };
            Box::pin(async move { result })
        }

        fn apply_update<'a>(
            &'a self,
            doc_id: &'a str,
            update: &'a ProgressUpdate,
        ) -> StoreFuture<'a, ()> {
            self.written
                .lock()
                .unwrap()
                .push((doc_id.to_string(), update.clone()));
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_pass_updates_each_document() {
        let store = Arc::new(
            MemoryStore::default()
                .with_doc("running", vec![TaskProgress::new(0.4, "parsing")])
                .with_doc("done", vec![TaskProgress::new(1.0, "indexed")])
                .with_doc("failed", vec![TaskProgress::new(-1.0, "bad pdf")])
                .with_doc("no-tasks", vec![]),
        );
        let updater = ProgressUpdater::new(store.clone());

        let report = updater.update_progress().await.unwrap();
        assert_eq!(
            report,
            ProgressReport {
                scanned: 4,
                updated: 3,
                finished: 2,
                failed_documents: 0,
            }
        );

        let written: HashMap<_, _> = store.written().into_iter().collect();
        assert_eq!(written["running"].run, RunStatus::Running);
        assert_eq!(written["done"].run, RunStatus::Done);
        assert_eq!(written["failed"].run, RunStatus::Fail);
        assert!(!written.contains_key("no-tasks"));
    }

    #[tokio::test]
    async fn test_broken_document_is_skipped() {
        let store = Arc::new(MemoryStore {
            broken_docs: vec!["corrupt".to_string()],
            ..MemoryStore::default()
                .with_doc("corrupt", vec![TaskProgress::new(0.5, "")])
                .with_doc("healthy", vec![TaskProgress::new(0.5, "")])
        });
        let updater = ProgressUpdater::new(store.clone());

        let report = updater.update_progress().await.unwrap();
        assert_eq!(report.failed_documents, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(store.written()[0].0, "healthy");
    }

    #[tokio::test]
    async fn test_listing_failure_fails_work_unit() {
        let store = Arc::new(MemoryStore {
            list_fails: true,
            ..Default::default()
        });
        let updater = ProgressUpdater::new(store);

        assert_eq!(updater.name(), "update_progress");
        let result = updater.execute().await;
        assert!(matches!(result, Err(RagdError::Database(_))));
    }
}
