//! Task submission service.
//!
//! Validates a raw task request, persists the pending record, and triggers
//! its dispatch without waiting for it. Validation failures never create a
//! record; dispatch failures never reach the submitter (a full queue leaves
//! the task pending for the recovery sweeper).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use courier_core::task::{Task, TaskInput, TaskKind, TaskRepository, TaskStatus};
use courier_core::{CourierError, Result};
use courier_execution::Dispatcher;

/// A raw submission as extracted from the transport layer: the kind by wire
/// name plus the kind-specific payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub kind: String,
    pub input: Value,
}

/// What the submitter gets back: the id to poll and the initial status.
#[derive(Debug, Clone, Serialize)]
pub struct TaskTicket {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Admits tasks into the store and hands them to the dispatcher.
pub struct SubmissionService {
    repo: Arc<dyn TaskRepository>,
    dispatcher: Dispatcher,
}

impl SubmissionService {
    pub fn new(repo: Arc<dyn TaskRepository>, dispatcher: Dispatcher) -> Self {
        Self { repo, dispatcher }
    }

    /// Validates and admits a task request for `owner`.
    ///
    /// Returns the new task's ticket immediately; execution happens in the
    /// background and the outcome is observable through
    /// [`TaskQueryService`](crate::query::TaskQueryService).
    pub async fn submit(&self, owner: &str, request: TaskRequest) -> Result<TaskTicket> {
        if owner.trim().is_empty() {
            return Err(CourierError::validation("owner must not be empty"));
        }
        let kind: TaskKind = request
            .kind
            .parse()
            .map_err(|_| CourierError::validation(format!("unknown task kind: {}", request.kind)))?;
        let input = TaskInput::from_request(kind, request.input)?;
        self.check_file_references(&input).await?;

        let task = Task::new(owner, input);
        self.repo.save(&task).await?;

        match self.dispatcher.dispatch(&task.id) {
            Ok(()) => {}
            Err(CourierError::Saturated) => {
                // Admission stands; the sweeper requeues the task once the
                // queue drains.
                warn!(task_id = %task.id, "dispatch queue saturated, task left pending");
            }
            Err(err) => return Err(err),
        }

        info!(task_id = %task.id, kind = %task.kind, owner, "task admitted");
        Ok(TaskTicket {
            task_id: task.id,
            status: task.status,
        })
    }

    /// Rejects inputs whose file references do not resolve to a readable
    /// regular file. Runs before the record is created, so a bad upload path
    /// fails the submission instead of the task.
    async fn check_file_references(&self, input: &TaskInput) -> Result<()> {
        let path = match input {
            TaskInput::DocumentIngest { file_path, .. } => file_path,
            TaskInput::ResumeAnalysis { resume_path, .. } => resume_path,
            TaskInput::Research { .. } | TaskInput::QueryTranslation { .. } => return Ok(()),
        };
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(CourierError::validation(format!(
                "file reference is not a regular file: {path}"
            ))),
            Err(_) => Err(CourierError::validation(format!(
                "file reference does not exist: {path}"
            ))),
        }
    }
}
