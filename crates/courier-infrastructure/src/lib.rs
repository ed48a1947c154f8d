//! Task store implementations.
//!
//! Two [`TaskRepository`](courier_core::TaskRepository) backends:
//!
//! - [`InMemoryTaskRepository`]: a concurrent map, for tests and ephemeral
//!   deployments
//! - [`JsonDirTaskRepository`]: one JSON file per task with atomic writes,
//!   durable across restarts so the recovery sweep can requeue interrupted
//!   work

pub mod json_dir;
pub mod memory;

pub use json_dir::JsonDirTaskRepository;
pub use memory::InMemoryTaskRepository;
