//! In-memory task repository.

use async_trait::async_trait;
use dashmap::DashMap;

use courier_core::task::{Task, TaskRepository};
use courier_core::Result;

/// Thread-safe in-memory repository backed by a [`DashMap`].
///
/// Shard-level locking gives concurrent reads and non-blocking writes to
/// distinct tasks for free. Records do not survive a restart; deployments
/// that need the recovery sweep to work across restarts use
/// [`JsonDirTaskRepository`](crate::json_dir::JsonDirTaskRepository).
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: DashMap<String, Task>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, task: &Task) -> Result<()> {
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.get(task_id).map(|entry| entry.value().clone()))
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| entry.value().owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn list_unfinished(&self) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .iter()
            .filter(|entry| !entry.value().is_terminal())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
