//! Directory-backed task repository.
//!
//! Each task is one JSON file under `<base>/tasks/<task-id>.json`. Saves go
//! through a temp file in the same directory followed by an atomic rename,
//! so readers never observe a half-written record and concurrent saves to
//! distinct tasks never touch the same file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use courier_core::task::{Task, TaskRepository};
use courier_core::{CourierError, Result};

const TASKS_SUBDIR: &str = "tasks";

/// One-JSON-file-per-task repository with atomic writes.
///
/// Durable across restarts: on boot, `list_unfinished` hands the recovery
/// sweeper every task that was in flight when the previous process died.
pub struct JsonDirTaskRepository {
    tasks_dir: PathBuf,
}

impl JsonDirTaskRepository {
    /// Opens (and creates if needed) a repository under `base_dir`.
    pub async fn new(base_dir: &Path) -> Result<Self> {
        let tasks_dir = base_dir.join(TASKS_SUBDIR);
        fs::create_dir_all(&tasks_dir).await.map_err(|e| {
            CourierError::storage(format!(
                "failed to create task directory {}: {}",
                tasks_dir.display(),
                e
            ))
        })?;
        Ok(Self { tasks_dir })
    }

    fn task_path(&self, task_id: &str) -> PathBuf {
        self.tasks_dir.join(format!("{task_id}.json"))
    }

    fn tmp_path(&self, task_id: &str) -> PathBuf {
        self.tasks_dir.join(format!(".{task_id}.json.tmp"))
    }

    async fn read_record(&self, path: &Path) -> Result<Option<Task>> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CourierError::storage(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        let task = serde_json::from_slice(&content).map_err(|e| {
            CourierError::storage(format!("corrupt task record {}: {}", path.display(), e))
        })?;
        Ok(Some(task))
    }

    async fn read_all(&self) -> Result<Vec<Task>> {
        let mut entries = fs::read_dir(&self.tasks_dir).await.map_err(|e| {
            CourierError::storage(format!(
                "failed to list {}: {}",
                self.tasks_dir.display(),
                e
            ))
        })?;

        let mut tasks = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            CourierError::storage(format!("failed to walk task directory: {e}"))
        })? {
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_record {
                continue;
            }
            match self.read_record(&path).await? {
                Some(task) => tasks.push(task),
                None => warn!(path = %path.display(), "task record vanished during listing"),
            }
        }
        Ok(tasks)
    }
}

#[async_trait]
impl TaskRepository for JsonDirTaskRepository {
    async fn save(&self, task: &Task) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(task)?;
        let tmp = self.tmp_path(&task.id);
        let path = self.task_path(&task.id);

        fs::write(&tmp, &encoded).await.map_err(|e| {
            CourierError::storage(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            CourierError::storage(format!("failed to commit {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    async fn find_by_id(&self, task_id: &str) -> Result<Option<Task>> {
        self.read_record(&self.task_path(task_id)).await
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read_all()
            .await?
            .into_iter()
            .filter(|task| task.owner == owner)
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn list_unfinished(&self) -> Result<Vec<Task>> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .filter(|task| !task.is_terminal())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use courier_core::task::{TaskInput, TaskResult, TaskStatus};
    use tempfile::TempDir;

    async fn open_repo() -> (JsonDirTaskRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = JsonDirTaskRepository::new(dir.path()).await.unwrap();
        (repo, dir)
    }

    fn task_for(owner: &str, query: &str) -> Task {
        Task::new(
            owner,
            TaskInput::Research {
                query: query.into(),
            },
        )
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let (repo, _dir) = open_repo().await;
        let mut task = task_for("user-1", "durable?");
        task.begin_processing(Duration::minutes(10)).unwrap();
        task.complete(TaskResult::Research {
            report: "yes".into(),
        })
        .unwrap();
        repo.save(&task).await.unwrap();

        let found = repo.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(found.id, task.id);
        assert_eq!(found.status, TaskStatus::Completed);
        assert_eq!(found.result, task.result);
        assert_eq!(found.completed_at, task.completed_at);
    }

    #[tokio::test]
    async fn missing_task_is_none() {
        let (repo, _dir) = open_repo().await;
        assert!(repo.find_by_id("no-such-task").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites_the_record() {
        let (repo, _dir) = open_repo().await;
        let mut task = task_for("user-1", "q");
        repo.save(&task).await.unwrap();

        task.begin_processing(Duration::minutes(10)).unwrap();
        repo.save(&task).await.unwrap();

        let found = repo.find_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(found.status, TaskStatus::Processing);
        assert_eq!(found.attempts, 1);
    }

    #[tokio::test]
    async fn unfinished_work_survives_a_reopen() {
        let dir = TempDir::new().unwrap();
        let mut stuck = task_for("user-1", "interrupted");
        stuck.begin_processing(Duration::minutes(10)).unwrap();
        let mut done = task_for("user-1", "finished");
        done.begin_processing(Duration::minutes(10)).unwrap();
        done.fail("executor unavailable").unwrap();

        {
            let repo = JsonDirTaskRepository::new(dir.path()).await.unwrap();
            repo.save(&stuck).await.unwrap();
            repo.save(&done).await.unwrap();
        }

        // a fresh process opening the same directory
        let repo = JsonDirTaskRepository::new(dir.path()).await.unwrap();
        let unfinished = repo.list_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0].id, stuck.id);
    }

    #[tokio::test]
    async fn list_by_owner_is_scoped_and_sorted() {
        let (repo, _dir) = open_repo().await;
        let mut older = task_for("user-1", "older");
        older.created_at = older.created_at - Duration::minutes(3);
        let newer = task_for("user-1", "newer");
        let foreign = task_for("user-2", "foreign");

        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();
        repo.save(&foreign).await.unwrap();

        let tasks = repo.list_by_owner("user-1").await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, newer.id);
        assert_eq!(tasks[1].id, older.id);
    }

    #[tokio::test]
    async fn concurrent_saves_to_distinct_tasks() {
        let (repo, _dir) = open_repo().await;
        let repo = std::sync::Arc::new(repo);

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let task = task_for("user-1", &format!("task {i}"));
                repo.save(&task).await.unwrap();
                task.id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        for id in ids {
            assert!(repo.find_by_id(&id).await.unwrap().is_some());
        }
        assert_eq!(repo.list_by_owner("user-1").await.unwrap().len(), 16);
    }
}
