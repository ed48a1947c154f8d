//! Subprocess-based executor client.
//!
//! Each call launches the executor as a child process with two positional
//! arguments (the method name and the JSON-encoded argument object), captures
//! stdout and stderr in full, and waits for exit. This client applies no
//! retry and no timeout; callers wrap it in
//! [`ResilientBridge`](crate::policy::ResilientBridge) for that.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, error};

use courier_core::config::BridgeSettings;
use courier_core::{CourierError, Result};

use crate::method::BridgeMethod;
use crate::payload::{self, BridgePayload};
use crate::Bridge;

/// Invokes the external executor as a subprocess, one launch per call.
pub struct ExecutorClient {
    /// Interpreter or binary to launch (e.g. `python3`).
    program: PathBuf,
    /// Executor script passed as the first argument.
    script: PathBuf,
    /// Optional working directory for the child.
    workdir: Option<PathBuf>,
}

impl ExecutorClient {
    /// Creates a client for the given interpreter and script.
    pub fn new(program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            workdir: None,
        }
    }

    /// Sets the working directory for executor launches.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    /// Builds a client from configuration.
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            program: PathBuf::from(&settings.program),
            script: settings.script.clone(),
            workdir: settings.workdir.clone(),
        }
    }
}

#[async_trait]
impl Bridge for ExecutorClient {
    async fn invoke(&self, method: BridgeMethod, args: &Value) -> Result<BridgePayload> {
        let args_json = serde_json::to_string(args)?;

        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script)
            .arg(method.as_str())
            .arg(&args_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The child must not outlive a dropped invocation: a caller's
            // deadline cancels the computation, not just the wait.
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        debug!(method = %method, args_bytes = args_json.len(), "invoking executor");

        let output = cmd.output().await.map_err(|e| {
            error!(method = %method, error = %e, "failed to start executor");
            CourierError::BridgeUnavailable(format!(
                "failed to start {}: {}",
                self.program.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(method = %method, status, stderr = %stderr, "executor exited abnormally");
            return Err(CourierError::BridgeExecutionFailed { status, stderr });
        }

        debug!(
            method = %method,
            stdout_bytes = output.stdout.len(),
            "executor completed"
        );
        payload::decode_response(method, &output.stdout)
    }
}
