//! End-to-end dispatcher and sweeper behavior against an in-memory store
//! and a scripted bridge.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use courier_bridge::{BridgePayload, GenerationOutput, MockBridge, ResumeReport};
use courier_core::task::{Task, TaskInput, TaskRepository, TaskResult, TaskStatus};
use courier_core::CourierError;
use courier_execution::sweeper::sweep_once;
use courier_execution::{Dispatcher, DispatcherConfig};
use courier_infrastructure::InMemoryTaskRepository;

fn research_task(owner: &str, query: &str) -> Task {
    Task::new(
        owner,
        TaskInput::Research {
            query: query.into(),
        },
    )
}

fn pool(workers: usize, queue_capacity: usize) -> DispatcherConfig {
    DispatcherConfig {
        workers,
        queue_capacity,
        lease_secs: 600,
    }
}

async fn wait_for_terminal(repo: &InMemoryTaskRepository, task_id: &str) -> Task {
    for _ in 0..200 {
        if let Some(task) = repo.find_by_id(task_id).await.unwrap() {
            if task.is_terminal() {
                return task;
            }
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

#[tokio::test]
async fn research_task_completes_with_result() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.push_ok(BridgePayload::Generation(GenerationOutput {
        response: "caffeine shortens total sleep time".into(),
    }));

    let dispatcher = Dispatcher::start(pool(2, 16), repo.clone(), bridge.clone());
    let task = research_task("user-1", "effects of caffeine on sleep");
    repo.save(&task).await.unwrap();
    dispatcher.dispatch(&task.id).unwrap();

    let done = wait_for_terminal(&repo, &task.id).await;
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(
        done.result,
        Some(TaskResult::Research {
            report: "caffeine shortens total sleep time".into()
        })
    );
    assert!(done.error.is_none());
    assert!(done.completed_at.is_some());
    assert_eq!(done.attempts, 1);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn reported_error_records_the_executor_message() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.push_err(CourierError::BridgeReportedError(
        "unsupported file format".into(),
    ));

    let dispatcher = Dispatcher::start(pool(1, 16), repo.clone(), bridge.clone());
    let task = Task::new(
        "user-1",
        TaskInput::ResumeAnalysis {
            resume_path: "/uploads/cv.docm".into(),
            job_description: "Backend engineer".into(),
        },
    );
    repo.save(&task).await.unwrap();
    dispatcher.dispatch(&task.id).unwrap();

    let done = wait_for_terminal(&repo, &task.id).await;
    assert_eq!(done.status, TaskStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("unsupported file format"));
    assert!(done.result.is_none());
    assert!(done.completed_at.is_some());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn execution_failure_is_absorbed_into_the_record() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.push_err(CourierError::BridgeExecutionFailed {
        status: 1,
        stderr: "ModuleNotFoundError: faiss".into(),
    });

    let dispatcher = Dispatcher::start(pool(1, 16), repo.clone(), bridge.clone());
    let task = research_task("user-1", "vector stores");
    repo.save(&task).await.unwrap();
    dispatcher.dispatch(&task.id).unwrap();

    let done = wait_for_terminal(&repo, &task.id).await;
    assert_eq!(done.status, TaskStatus::Failed);
    let error = done.error.unwrap();
    assert!(error.contains("status 1"));
    assert!(error.contains("faiss"));

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn duplicate_dispatch_runs_the_task_once() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.push_ok(BridgePayload::Generation(GenerationOutput {
        response: "only answer".into(),
    }));

    // single worker, so the second queue entry arrives after the first run
    let dispatcher = Dispatcher::start(pool(1, 16), repo.clone(), bridge.clone());
    let task = research_task("user-1", "dedup");
    repo.save(&task).await.unwrap();
    dispatcher.dispatch(&task.id).unwrap();
    dispatcher.dispatch(&task.id).unwrap();

    let done = wait_for_terminal(&repo, &task.id).await;
    // give the duplicate time to drain through the worker
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(bridge.calls().len(), 1);
    let after = repo.find_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(after.attempts, 1);
    assert_eq!(after.completed_at, done.completed_at);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn sweep_requeues_an_expired_lease() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.push_ok(BridgePayload::Resume(ResumeReport {
        feedback: "quantify your impact".into(),
        score: 64,
    }));

    // a worker crashed mid-call: processing, lease lapsed, no terminal write
    let mut task = Task::new(
        "user-1",
        TaskInput::ResumeAnalysis {
            resume_path: "/uploads/cv.pdf".into(),
            job_description: "Data engineer".into(),
        },
    );
    task.begin_processing(Duration::minutes(10)).unwrap();
    task.lease_expires_at = Some(Utc::now() - Duration::minutes(1));
    repo.save(&task).await.unwrap();

    let dispatcher = Dispatcher::start(pool(1, 16), repo.clone(), bridge.clone());
    let requeued = sweep_once(repo.as_ref(), &dispatcher, Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(requeued, 1);

    let done = wait_for_terminal(&repo, &task.id).await;
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.attempts, 2);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn sweep_leaves_fresh_work_alone() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    let dispatcher = Dispatcher::start(pool(0, 16), repo.clone(), bridge.clone());

    // freshly admitted pending task
    let pending = research_task("user-1", "fresh");
    repo.save(&pending).await.unwrap();

    // processing task under a live lease
    let mut claimed = research_task("user-1", "claimed");
    claimed.begin_processing(Duration::minutes(10)).unwrap();
    repo.save(&claimed).await.unwrap();

    let requeued = sweep_once(repo.as_ref(), &dispatcher, Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(requeued, 0);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn sweep_recovers_a_stale_pending_task() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    bridge.push_ok(BridgePayload::Generation(GenerationOutput {
        response: "recovered".into(),
    }));

    // admitted but its dispatch was lost (queue overflow or restart)
    let mut task = research_task("user-1", "lost dispatch");
    task.updated_at = Utc::now() - Duration::hours(1);
    repo.save(&task).await.unwrap();

    let dispatcher = Dispatcher::start(pool(1, 16), repo.clone(), bridge.clone());
    let requeued = sweep_once(repo.as_ref(), &dispatcher, Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(requeued, 1);

    let done = wait_for_terminal(&repo, &task.id).await;
    assert_eq!(done.status, TaskStatus::Completed);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn saturated_queue_defers_the_rest_of_the_sweep() {
    let repo = Arc::new(InMemoryTaskRepository::new());
    let bridge = Arc::new(MockBridge::new());
    // no workers: nothing drains the queue
    let dispatcher = Dispatcher::start(pool(0, 1), repo.clone(), bridge.clone());

    for i in 0..3 {
        let mut task = research_task("user-1", &format!("stalled {i}"));
        task.updated_at = Utc::now() - Duration::hours(1);
        repo.save(&task).await.unwrap();
    }

    let requeued = sweep_once(repo.as_ref(), &dispatcher, Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(requeued, 1);

    // direct dispatch now reports saturation to the caller
    let extra = research_task("user-1", "one more");
    repo.save(&extra).await.unwrap();
    assert!(matches!(
        dispatcher.dispatch(&extra.id),
        Err(CourierError::Saturated)
    ));

    dispatcher.shutdown().await;
}
