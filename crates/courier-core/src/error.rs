//! Error types for the Courier application.

use serde::Serialize;
use thiserror::Error;

use crate::task::TaskStatus;

/// A shared error type for the entire Courier application.
///
/// Bridge failures are deliberately split into one variant per failure
/// condition so that the dispatcher and the retry policy can classify them
/// without string matching: only [`BridgeUnavailable`](CourierError::BridgeUnavailable)
/// is transient, everything else is terminal for the attempt.
#[derive(Error, Debug, Clone, Serialize)]
pub enum CourierError {
    /// Client-fault request error. No task record is created when this is
    /// returned from submission.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Entity not found. Also returned for tasks owned by a different
    /// principal, so absence and foreign ownership are indistinguishable.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The executor process could not be started.
    #[error("executor unavailable: {0}")]
    BridgeUnavailable(String),

    /// The executor process exited with a non-zero status.
    #[error("executor exited with status {status}: {stderr}")]
    BridgeExecutionFailed { status: i32, stderr: String },

    /// The executor's output did not match the expected response shape.
    #[error("executor protocol violation: {0}")]
    BridgeProtocolViolation(String),

    /// The executor completed but reported a failure in its response body.
    #[error("executor reported: {0}")]
    BridgeReportedError(String),

    /// The executor did not answer within the configured deadline.
    #[error("executor call timed out after {timeout_secs}s")]
    BridgeTimeout { timeout_secs: u64 },

    /// Attempted a backward or otherwise illegal task status transition.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// The dispatch queue is full. The task stays pending and is picked up
    /// by the recovery sweeper.
    #[error("dispatch queue saturated")]
    Saturated,

    /// Task store failure (repository/storage layer).
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error (file system operations).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a Storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for failures worth retrying against the executor.
    ///
    /// Only a failed process start qualifies; a reported error, a protocol
    /// violation, or a non-zero exit will not get better on a second launch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BridgeUnavailable(_))
    }

    /// Returns true if the error is the caller's fault rather than the
    /// system's.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound { .. })
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for CourierError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CourierError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A type alias for `Result<T, CourierError>`.
pub type Result<T> = std::result::Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(CourierError::BridgeUnavailable("spawn failed".into()).is_retryable());
        assert!(!CourierError::BridgeReportedError("bad input".into()).is_retryable());
        assert!(!CourierError::BridgeProtocolViolation("not json".into()).is_retryable());
        assert!(
            !CourierError::BridgeExecutionFailed {
                status: 1,
                stderr: "trace".into()
            }
            .is_retryable()
        );
        assert!(!CourierError::BridgeTimeout { timeout_secs: 30 }.is_retryable());
    }

    #[test]
    fn client_fault_classification() {
        assert!(CourierError::validation("bad kind").is_client_fault());
        assert!(CourierError::not_found("task", "t-1").is_client_fault());
        assert!(!CourierError::storage("db down").is_client_fault());
        assert!(!CourierError::Saturated.is_client_fault());
    }

    #[test]
    fn display_carries_context() {
        let err = CourierError::BridgeExecutionFailed {
            status: 3,
            stderr: "ModuleNotFoundError: faiss".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("status 3"));
        assert!(msg.contains("faiss"));

        let err = CourierError::not_found("task", "abc-123");
        assert_eq!(err.to_string(), "task not found: abc-123");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CourierError = io.into();
        assert!(matches!(err, CourierError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
