//! Scriptable bridge for tests.
//!
//! Downstream crates (dispatcher, application services) test against
//! [`MockBridge`] instead of a real executor: queue the outcomes in order,
//! run the code under test, then inspect the recorded invocations.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use courier_core::{CourierError, Result};

use crate::method::BridgeMethod;
use crate::payload::BridgePayload;
use crate::Bridge;

/// A [`Bridge`] that replays queued outcomes and records every invocation.
#[derive(Default)]
pub struct MockBridge {
    outcomes: Mutex<VecDeque<Result<BridgePayload>>>,
    calls: Mutex<Vec<(BridgeMethod, Value)>>,
}

impl MockBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful outcome.
    pub fn push_ok(&self, payload: BridgePayload) {
        self.outcomes.lock().unwrap().push_back(Ok(payload));
    }

    /// Queues a failure outcome.
    pub fn push_err(&self, error: CourierError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    /// The invocations seen so far, in order.
    pub fn calls(&self) -> Vec<(BridgeMethod, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bridge for MockBridge {
    async fn invoke(&self, method: BridgeMethod, args: &Value) -> Result<BridgePayload> {
        self.calls.lock().unwrap().push((method, args.clone()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(CourierError::internal(format!(
                    "no scripted outcome for {method}"
                )))
            })
    }
}
