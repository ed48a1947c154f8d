//! Bridge client for the external computation executor.
//!
//! The executor is a separate process (in production, a Python script) that
//! performs one logical operation per invocation: it is launched with a
//! method name and a JSON argument object, writes a single JSON value to
//! stdout, and exits. This crate owns everything about that boundary:
//!
//! - [`BridgeMethod`]: the fixed registry of executor methods
//! - [`BridgePayload`] and [`decode_response`](payload::decode_response):
//!   the per-method response shapes
//! - [`ExecutorClient`]: the raw subprocess invocation (no retry, no
//!   timeout)
//! - [`ResilientBridge`]: the deadline + bounded-retry policy wrapper
//! - [`MockBridge`]: a scriptable implementation for tests in downstream
//!   crates

pub mod method;
pub mod mock;
pub mod payload;
pub mod policy;
pub mod subprocess;

use async_trait::async_trait;
use serde_json::Value;

use courier_core::Result;

pub use method::BridgeMethod;
pub use mock::MockBridge;
pub use payload::{BridgePayload, GenerationOutput, IngestReceipt, ResumeReport};
pub use policy::ResilientBridge;
pub use subprocess::ExecutorClient;

/// One synchronous call to the external executor.
///
/// Implementations translate the executor's output into a typed
/// [`BridgePayload`] or one of the bridge error variants on
/// [`CourierError`](courier_core::CourierError). The trait is the seam the
/// dispatcher and the application services program against, which is what
/// lets tests substitute [`MockBridge`] and lets the policy wrapper compose
/// over any implementation.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// Invokes `method` with the given JSON argument object.
    async fn invoke(&self, method: BridgeMethod, args: &Value) -> Result<BridgePayload>;
}

#[async_trait]
impl<T: Bridge + ?Sized> Bridge for std::sync::Arc<T> {
    async fn invoke(&self, method: BridgeMethod, args: &Value) -> Result<BridgePayload> {
        (**self).invoke(method, args).await
    }
}
