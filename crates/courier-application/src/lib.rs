//! Application services.
//!
//! The public-facing operations of the delegation core, kept free of any
//! transport concern. The request router hands these services an already
//! authenticated owner identity and a parsed request body; everything HTTP
//! stays outside.
//!
//! - [`SubmissionService`]: validate and admit a task, trigger its dispatch
//! - [`TaskQueryService`]: owner-scoped task reads
//! - [`ChatService`]: the synchronous retrieval-augmented chat flow

pub mod chat;
pub mod query;
pub mod submission;

pub use chat::{ChatAnswer, ChatService};
pub use query::TaskQueryService;
pub use submission::{SubmissionService, TaskRequest, TaskTicket};
