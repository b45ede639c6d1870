//! Folding per-task progress into one document-level update.

use chrono::{DateTime, Utc};

use super::status::RunStatus;

/// Progress reported by one parsing task of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskProgress {
    /// Fraction done in `[0, 1]`; negative means the task failed.
    pub progress: f64,
    /// Last message the task reported.
    pub progress_msg: String,
}

impl TaskProgress {
    pub fn new(progress: f64, progress_msg: impl Into<String>) -> Self {
        Self {
            progress,
            progress_msg: progress_msg.into(),
        }
    }

    fn is_pending(&self) -> bool {
        (0.0..1.0).contains(&self.progress)
    }

    fn is_failed(&self) -> bool {
        self.progress < 0.0
    }
}

/// A document that is still being parsed.
#[derive(Debug, Clone)]
pub struct UnfinishedDocument {
    pub id: String,
    pub run: RunStatus,
    pub process_begin_at: Option<DateTime<Utc>>,
}

/// New progress columns for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub run: RunStatus,
    /// Left unchanged when `None`.
    pub progress: Option<f64>,
    /// Left unchanged when `None`.
    pub progress_msg: Option<String>,
    /// Seconds spent since processing began.
    pub process_duration: f64,
}

impl ProgressUpdate {
    /// Whether the document reached a final state with this update.
    pub fn is_finished(&self) -> bool {
        matches!(self.run, RunStatus::Done | RunStatus::Fail)
    }
}

/// Compute the update for `doc` from its tasks, or `None` when it has no tasks yet.
///
/// The document finishes once no task is between 0 and 1. A finished
/// document with any failed task is marked failed with progress `-1`.
pub fn aggregate_progress(
    doc: &UnfinishedDocument,
    tasks: &[TaskProgress],
    now: DateTime<Utc>,
) -> Option<ProgressUpdate> {
    if tasks.is_empty() {
        return None;
    }

    let finished = !tasks.iter().any(TaskProgress::is_pending);
    let bad = tasks.iter().filter(|t| t.is_failed()).count();
    let total: f64 = tasks.iter().map(|t| t.progress.max(0.0)).sum();
    let mut progress = total / tasks.len() as f64;

    let run = if finished && bad > 0 {
        progress = -1.0;
        RunStatus::Fail
    } else if finished {
        RunStatus::Done
    } else {
        doc.run
    };

    let progress_msg = tasks
        .iter()
        .map(|t| t.progress_msg.as_str())
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let process_duration = doc
        .process_begin_at
        .map(|begin| (now - begin).num_milliseconds().max(0) as f64 / 1000.0)
        .unwrap_or(0.0);

    Some(ProgressUpdate {
        run,
        progress: (progress != 0.0).then_some(progress),
        progress_msg: (!progress_msg.is_empty()).then_some(progress_msg),
        process_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_doc() -> UnfinishedDocument {
        UnfinishedDocument {
            id: "doc-1".to_string(),
            run: RunStatus::Running,
            process_begin_at: None,
        }
    }

    #[test]
    fn test_no_tasks_yields_no_update() {
        assert!(aggregate_progress(&running_doc(), &[], Utc::now()).is_none());
    }

    #[test]
    fn test_partial_progress_keeps_running() {
        let tasks = vec![
            TaskProgress::new(1.0, "page 1-12 done"),
            TaskProgress::new(0.5, "embedding"),
        ];

        let update = aggregate_progress(&running_doc(), &tasks, Utc::now()).unwrap();
        assert_eq!(update.run, RunStatus::Running);
        assert_eq!(update.progress, Some(0.75));
        assert_eq!(
            update.progress_msg.as_deref(),
            Some("page 1-12 done\nembedding")
        );
        assert!(!update.is_finished());
    }

    #[test]
    fn test_all_tasks_done_marks_document_done() {
        let tasks = vec![TaskProgress::new(1.0, ""), TaskProgress::new(1.0, "")];

        let update = aggregate_progress(&running_doc(), &tasks, Utc::now()).unwrap();
        assert_eq!(update.run, RunStatus::Done);
        assert_eq!(update.progress, Some(1.0));
        assert_eq!(update.progress_msg, None);
        assert!(update.is_finished());
    }

    #[test]
    fn test_failed_task_fails_finished_document() {
        let tasks = vec![
            TaskProgress::new(1.0, "ok"),
            TaskProgress::new(-1.0, "OCR crashed"),
        ];

        let update = aggregate_progress(&running_doc(), &tasks, Utc::now()).unwrap();
        assert_eq!(update.run, RunStatus::Fail);
        assert_eq!(update.progress, Some(-1.0));
    }

    #[test]
    fn test_failed_task_waits_for_pending_siblings() {
        let tasks = vec![
            TaskProgress::new(-1.0, "OCR crashed"),
            TaskProgress::new(0.2, "chunking"),
        ];

        let update = aggregate_progress(&running_doc(), &tasks, Utc::now()).unwrap();
        assert_eq!(update.run, RunStatus::Running);
        assert_eq!(update.progress, Some(0.1));
    }

    #[test]
    fn test_zero_progress_is_not_written() {
        let tasks = vec![TaskProgress::new(0.0, "queued")];

        let update = aggregate_progress(&running_doc(), &tasks, Utc::now()).unwrap();
        assert_eq!(update.progress, None);
        assert_eq!(update.progress_msg.as_deref(), Some("queued"));
    }

    #[test]
    fn test_process_duration_from_begin() {
        let now = Utc::now();
        let doc = UnfinishedDocument {
            process_begin_at: Some(now - chrono::Duration::milliseconds(12_500)),
            ..running_doc()
        };

        let update = aggregate_progress(&doc, &[TaskProgress::new(0.3, "")], now).unwrap();
        assert!((update.process_duration - 12.5).abs() < 1e-9);
    }
}
