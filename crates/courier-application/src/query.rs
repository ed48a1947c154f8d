//! Owner-scoped task reads.

use std::sync::Arc;

use courier_core::task::{Task, TaskRepository};
use courier_core::{CourierError, Result};

/// Read-only view over the task store.
///
/// Purely observational: never mutates state, safe to call arbitrarily often
/// and concurrently with running dispatches.
pub struct TaskQueryService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskQueryService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    /// Returns the full current record of a task owned by `owner`.
    ///
    /// A task that does not exist and a task owned by someone else produce
    /// the same `NotFound`, so callers cannot probe for foreign task ids.
    pub async fn status(&self, owner: &str, task_id: &str) -> Result<Task> {
        match self.repo.find_by_id(task_id).await? {
            Some(task) if task.owner == owner => Ok(task),
            _ => Err(CourierError::not_found("task", task_id)),
        }
    }

    /// Lists the owner's tasks, most recent first.
    pub async fn list(&self, owner: &str) -> Result<Vec<Task>> {
        self.repo.list_by_owner(owner).await
    }
}
