//! Task domain model.
//!
//! Contains the central [`Task`] entity, its lifecycle state machine, and the
//! kind-specific input and result payloads. Tasks move strictly forward:
//! `pending -> processing -> completed | failed`. Terminal states accept no
//! further transitions, and exactly one of `result`/`error` is populated once
//! a task is terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::{CourierError, Result};

/// The current lifecycle state of a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    /// Created and admitted, waiting for a worker.
    Pending,
    /// A worker holds the task under a lease and is running the executor.
    Processing,
    /// The executor produced a result. Terminal.
    Completed,
    /// The executor call failed. Terminal.
    Failed,
}

impl TaskStatus {
    /// Returns true for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a forward transition from `self` to `to` is legal.
    ///
    /// `processing -> processing` is allowed to model a lease takeover after
    /// expiry; the caller ([`Task::begin_processing`]) checks the lease.
    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

/// The registered task kinds, matching the capabilities of the external
/// executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TaskKind {
    /// Extract, chunk, and index an uploaded document.
    DocumentIngest,
    /// Open-ended research synthesis for a free-text query.
    Research,
    /// Score a resume against a job description.
    ResumeAnalysis,
    /// Translate a natural-language question into SQL.
    QueryTranslation,
}

/// Kind-specific input payload, captured at submission time and immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskInput {
    DocumentIngest {
        document_id: i64,
        file_path: String,
    },
    Research {
        query: String,
    },
    ResumeAnalysis {
        resume_path: String,
        job_description: String,
    },
    QueryTranslation {
        natural_query: String,
    },
}

#[derive(Deserialize)]
struct DocumentIngestPayload {
    document_id: i64,
    file_path: String,
}

#[derive(Deserialize)]
struct ResearchPayload {
    query: String,
}

#[derive(Deserialize)]
struct ResumeAnalysisPayload {
    resume_path: String,
    job_description: String,
}

#[derive(Deserialize)]
struct QueryTranslationPayload {
    natural_query: String,
}

impl TaskInput {
    /// The task kind this input belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::DocumentIngest { .. } => TaskKind::DocumentIngest,
            Self::Research { .. } => TaskKind::Research,
            Self::ResumeAnalysis { .. } => TaskKind::ResumeAnalysis,
            Self::QueryTranslation { .. } => TaskKind::QueryTranslation,
        }
    }

    /// Parses and validates a raw submission payload for the given kind.
    ///
    /// The payload must deserialize into the kind's shape and all required
    /// text fields must be non-empty. File references are only checked
    /// structurally here; existence checks belong to the submission service,
    /// which has filesystem access.
    pub fn from_request(kind: TaskKind, payload: Value) -> Result<Self> {
        let invalid = |detail: String| {
            CourierError::validation(format!("invalid input for {kind} task: {detail}"))
        };

        match kind {
            TaskKind::DocumentIngest => {
                let p: DocumentIngestPayload =
                    serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))?;
                if p.file_path.trim().is_empty() {
                    return Err(invalid("file_path must not be empty".into()));
                }
                Ok(Self::DocumentIngest {
                    document_id: p.document_id,
                    file_path: p.file_path,
                })
            }
            TaskKind::Research => {
                let p: ResearchPayload =
                    serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))?;
                if p.query.trim().is_empty() {
                    return Err(invalid("query must not be empty".into()));
                }
                Ok(Self::Research { query: p.query })
            }
            TaskKind::ResumeAnalysis => {
                let p: ResumeAnalysisPayload =
                    serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))?;
                if p.resume_path.trim().is_empty() {
                    return Err(invalid("resume_path must not be empty".into()));
                }
                if p.job_description.trim().is_empty() {
                    return Err(invalid("job_description must not be empty".into()));
                }
                Ok(Self::ResumeAnalysis {
                    resume_path: p.resume_path,
                    job_description: p.job_description,
                })
            }
            TaskKind::QueryTranslation => {
                let p: QueryTranslationPayload =
                    serde_json::from_value(payload).map_err(|e| invalid(e.to_string()))?;
                if p.natural_query.trim().is_empty() {
                    return Err(invalid("natural_query must not be empty".into()));
                }
                Ok(Self::QueryTranslation {
                    natural_query: p.natural_query,
                })
            }
        }
    }
}

/// Kind-specific result payload, present only on completed tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    DocumentIngest { success: bool },
    Research { report: String },
    ResumeAnalysis { feedback: String, score: i32 },
    QueryTranslation { sql: String },
}

/// One unit of delegated asynchronous computation.
///
/// The task store holds the only authoritative copy of a task; workers read
/// the input once and write the outcome once via the lifecycle methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned at creation, never reused.
    pub id: String,
    pub kind: TaskKind,
    /// Opaque principal identifier from the authentication collaborator.
    pub owner: String,
    pub input: TaskInput,
    pub status: TaskStatus,
    /// Present exactly when `status` is `completed`.
    pub result: Option<TaskResult>,
    /// Present exactly when `status` is `failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Touched on every persisted transition; the sweeper uses it to spot
    /// pending tasks that never made it into the queue.
    pub updated_at: DateTime<Utc>,
    /// Set exactly once, at the first transition into a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// While processing, the instant after which the worker's claim no
    /// longer counts and the sweeper may requeue the task.
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Number of times a worker has picked this task up.
    pub attempts: u32,
}

impl Task {
    /// Creates a freshly admitted task in the `pending` state.
    pub fn new(owner: impl Into<String>, input: TaskInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind: input.kind(),
            owner: owner.into(),
            input,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            lease_expires_at: None,
            attempts: 0,
        }
    }

    /// Returns true once the task has reached `completed` or `failed`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the processing lease has lapsed at `now`.
    ///
    /// A processing task without a lease is treated as expired so the
    /// sweeper can always reclaim it.
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        match self.lease_expires_at {
            Some(expiry) => now > expiry,
            None => true,
        }
    }

    /// Claims the task for execution under a fresh lease.
    ///
    /// Legal from `pending`, or from `processing` when the previous lease
    /// has expired (a takeover after a crashed or hung worker). Increments
    /// the attempt counter.
    pub fn begin_processing(&mut self, lease: Duration) -> Result<()> {
        let now = Utc::now();
        match self.status {
            TaskStatus::Pending => {}
            TaskStatus::Processing if self.lease_expired(now) => {}
            from => {
                return Err(CourierError::InvalidTransition {
                    from,
                    to: TaskStatus::Processing,
                });
            }
        }
        self.status = TaskStatus::Processing;
        self.lease_expires_at = Some(now + lease);
        self.updated_at = now;
        self.attempts += 1;
        Ok(())
    }

    /// Records the successful outcome. Legal only from `processing`.
    pub fn complete(&mut self, result: TaskResult) -> Result<()> {
        self.finish(TaskStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// Records the failure outcome. Legal only from `processing`.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.finish(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn finish(&mut self, to: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(CourierError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.lease_expires_at = None;
        Ok(())
    }
}
