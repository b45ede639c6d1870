use chrono::{DateTime, Utc};
use sqlx::Row;

use ragd_core::error::{RagdError, Result};
use ragd_core::progress::{
    ProgressStore, ProgressUpdate, RunStatus, StoreFuture, TaskProgress, UnfinishedDocument,
};

/// Progress store over the document and task tables in PostgreSQL.
#[derive(Clone)]
pub struct PgProgressStore {
    pool: sqlx::PgPool,
}

impl PgProgressStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_unfinished(&self) -> Result<Vec<UnfinishedDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT id, run, process_begin_at
            FROM document
            WHERE status = '1'
              AND type <> 'virtual'
              AND progress < 1
              AND progress > 0
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagdError::Database(e.to_string()))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let run: Option<String> = row.get("run");
            let process_begin_at: Option<DateTime<Utc>> = row.get("process_begin_at");
            let run = run
                .as_deref()
                .and_then(RunStatus::from_str)
                .unwrap_or(RunStatus::Running);
            documents.push(UnfinishedDocument {
                id,
                run,
                process_begin_at,
            });
        }
        Ok(documents)
    }

    async fn fetch_tasks(&self, doc_id: &str) -> Result<Vec<TaskProgress>> {
        let rows: Vec<(f64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT progress, progress_msg
            FROM task
            WHERE doc_id = $1
            ORDER BY create_time ASC
            "#,
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagdError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(progress, msg)| TaskProgress::new(progress, msg.unwrap_or_default()))
            .collect())
    }

    async fn write_update(&self, doc_id: &str, update: &ProgressUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE document
            SET run = $2,
                progress = COALESCE($3, progress),
                progress_msg = COALESCE($4, progress_msg),
                process_duation = $5 -- sic, existing column name
            WHERE id = $1
            "#,
        )
        .bind(doc_id)
        .bind(update.run.as_str())
        .bind(update.progress)
        .bind(update.progress_msg.as_deref())
        .bind(update.process_duration)
        .execute(&self.pool)
        .await
        .map_err(|e| RagdError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            tracing::debug!(doc_id, "Document vanished before progress update");
        }
        Ok(())
    }
}

impl ProgressStore for PgProgressStore {
    fn unfinished_documents(&self) -> StoreFuture<'_, Vec<UnfinishedDocument>> {
        Box::pin(self.fetch_unfinished())
    }

    fn document_tasks<'a>(&'a self, doc_id: &'a str) -> StoreFuture<'a, Vec<TaskProgress>> {
        Box::pin(self.fetch_tasks(doc_id))
    }

    fn apply_update<'a>(
        &'a self,
        doc_id: &'a str,
        update: &'a ProgressUpdate,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.write_update(doc_id, update))
    }
}
