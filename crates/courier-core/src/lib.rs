//! Domain layer for the Courier task delegation core.
//!
//! This crate holds everything the other layers agree on: the task model and
//! its lifecycle state machine, the repository contract for task persistence,
//! the shared error type, and the configuration model. It has no runtime
//! dependencies beyond serialization and time handling; all I/O lives in the
//! infrastructure, bridge, and execution crates.

pub mod config;
pub mod error;
pub mod task;

// Re-export the common error type and the task vocabulary.
pub use config::CourierConfig;
pub use error::{CourierError, Result};
pub use task::{Task, TaskInput, TaskKind, TaskRepository, TaskResult, TaskStatus};
