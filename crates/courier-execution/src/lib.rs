//! Task execution domain.
//!
//! Turns admitted tasks into executor calls and terminal records:
//!
//! - [`Dispatcher`]: a bounded worker pool fed by an explicit queue.
//!   Dispatching never blocks the submitter; a full queue is backpressure,
//!   not an error the client sees.
//! - [`RecoverySweeper`]: periodically requeues tasks whose processing lease
//!   expired without a terminal write (crashed or hung worker) and pending
//!   tasks that missed their dispatch (queue overflow, process restart).
//! - [`route`]: the mapping between task kinds and executor methods.

pub mod dispatcher;
pub mod route;
pub mod sweeper;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use sweeper::{RecoverySweeper, SweeperConfig};
