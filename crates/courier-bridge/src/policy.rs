//! Deadline and retry policy around a bridge implementation.
//!
//! The raw [`ExecutorClient`](crate::subprocess::ExecutorClient) blocks for
//! as long as the executor runs and gives up on the first failure. This
//! wrapper adds the two behaviors every caller actually wants: a per-attempt
//! deadline, and a small bounded retry for failed process starts. Reported
//! errors, protocol violations, and abnormal exits are never retried; the
//! executor already ran (or produced output), so launching it again would
//! either duplicate work or fail identically.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use backoff::future::retry;
use serde_json::Value;
use tracing::warn;

use courier_core::config::BridgeSettings;
use courier_core::{CourierError, Result};

use crate::method::BridgeMethod;
use crate::payload::BridgePayload;
use crate::Bridge;

/// Wraps any [`Bridge`] with a per-attempt deadline and bounded retries.
///
/// Because the inner client kills its child when the invocation future is
/// dropped, the deadline here is a true cancellation of the external
/// computation, not just an abandoned wait.
pub struct ResilientBridge<B> {
    inner: B,
    timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

impl<B> ResilientBridge<B> {
    /// Creates a policy wrapper with explicit parameters.
    ///
    /// `max_retries` counts retries after the first attempt, so the total
    /// number of launches is at most `max_retries + 1`.
    pub fn new(inner: B, timeout: Duration, max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_retries,
            initial_backoff,
        }
    }

    /// Builds the wrapper from configuration.
    pub fn from_settings(inner: B, settings: &BridgeSettings) -> Self {
        Self::new(
            inner,
            Duration::from_secs(settings.timeout_secs),
            settings.max_retries,
            Duration::from_millis(settings.retry_initial_backoff_ms),
        )
    }
}

#[async_trait]
impl<B: Bridge> Bridge for ResilientBridge<B> {
    async fn invoke(&self, method: BridgeMethod, args: &Value) -> Result<BridgePayload> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_elapsed_time(None)
            .build();
        let attempts = AtomicU32::new(0);
        let timeout_secs = self.timeout.as_secs();

        retry(policy, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            async move {
                match tokio::time::timeout(self.timeout, self.inner.invoke(method, args)).await {
                    Ok(Ok(payload)) => Ok(payload),
                    Ok(Err(err)) if err.is_retryable() && attempt < self.max_retries => {
                        warn!(
                            method = %method,
                            attempt = attempt + 1,
                            error = %err,
                            "transient executor failure, retrying"
                        );
                        Err(backoff::Error::transient(err))
                    }
                    Ok(Err(err)) => Err(backoff::Error::permanent(err)),
                    Err(_) => Err(backoff::Error::permanent(CourierError::BridgeTimeout {
                        timeout_secs,
                    })),
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBridge;
    use crate::payload::GenerationOutput;
    use serde_json::json;
    use std::sync::Arc;

    fn generation(text: &str) -> BridgePayload {
        BridgePayload::Generation(GenerationOutput {
            response: text.into(),
        })
    }

    fn wrap(inner: Arc<MockBridge>, max_retries: u32) -> ResilientBridge<Arc<MockBridge>> {
        ResilientBridge::new(
            inner,
            Duration::from_secs(5),
            max_retries,
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn retries_unavailable_then_succeeds() {
        let mock = Arc::new(MockBridge::new());
        mock.push_err(CourierError::BridgeUnavailable("spawn failed".into()));
        mock.push_ok(generation("recovered"));

        let bridge = wrap(mock.clone(), 2);
        let payload = bridge
            .invoke(BridgeMethod::ConductResearch, &json!({"research_query": "q"}))
            .await
            .unwrap();
        assert_eq!(payload, generation("recovered"));
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let mock = Arc::new(MockBridge::new());
        for _ in 0..5 {
            mock.push_err(CourierError::BridgeUnavailable("spawn failed".into()));
        }

        let bridge = wrap(mock.clone(), 2);
        let err = bridge
            .invoke(BridgeMethod::ConductResearch, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::BridgeUnavailable(_)));
        // first attempt + two retries
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn reported_errors_are_not_retried() {
        let mock = Arc::new(MockBridge::new());
        mock.push_err(CourierError::BridgeReportedError("bad resume".into()));
        mock.push_ok(generation("never reached"));

        let bridge = wrap(mock.clone(), 3);
        let err = bridge
            .invoke(BridgeMethod::AnalyzeResume, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::BridgeReportedError(_)));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn deadline_turns_into_timeout_error() {
        struct SlowBridge;

        #[async_trait]
        impl Bridge for SlowBridge {
            async fn invoke(&self, _: BridgeMethod, _: &Value) -> Result<BridgePayload> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(BridgePayload::Chunks(vec![]))
            }
        }

        let bridge = ResilientBridge::new(
            SlowBridge,
            Duration::from_millis(50),
            2,
            Duration::from_millis(5),
        );
        let err = bridge
            .invoke(BridgeMethod::SearchSimilarChunks, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::BridgeTimeout { .. }));
    }
}
