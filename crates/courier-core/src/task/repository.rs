//! Task repository trait.
//!
//! Defines the persistence contract for task records.

use async_trait::async_trait;

use super::model::Task;
use crate::error::Result;

/// An abstract repository for managing task persistence.
///
/// This trait decouples the application's core logic from the specific
/// storage mechanism (in-memory map, JSON directory, database). The store
/// holds the only authoritative copy of a task.
///
/// # Implementation Notes
///
/// Implementations must support concurrent reads, and writes to distinct
/// tasks must not block each other. Writers always persist the whole record;
/// the lifecycle methods on [`Task`] guarantee only forward transitions are
/// ever saved.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persists a task, inserting or overwriting by id.
    async fn save(&self, task: &Task) -> Result<()>;

    /// Finds a task by its id.
    ///
    /// Returns `Ok(None)` when no task with that id exists.
    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>>;

    /// Lists all tasks belonging to an owner, most recent first.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Task>>;

    /// Lists tasks that have not reached a terminal state.
    ///
    /// This is the recovery sweeper's view: pending tasks that may have
    /// missed their dispatch and processing tasks whose lease may have
    /// expired.
    async fn list_unfinished(&self) -> Result<Vec<Task>>;
}
