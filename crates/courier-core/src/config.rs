//! Configuration model.
//!
//! Courier is configured through a single TOML file with three sections:
//! `[bridge]` for the external executor, `[dispatcher]` for the worker pool
//! and recovery sweeper, and `[storage]` for the task store location. Every
//! field has a default so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CourierError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub bridge: BridgeSettings,
    pub dispatcher: DispatcherSettings,
    pub storage: StorageSettings,
}

/// Settings for invoking the external executor process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Interpreter or binary to launch.
    pub program: String,
    /// Executor script passed as the first argument.
    pub script: PathBuf,
    /// Working directory for the executor, if it needs one.
    pub workdir: Option<PathBuf>,
    /// Per-attempt deadline for one executor call.
    pub timeout_secs: u64,
    /// Retries after the first attempt, applied only to failed process
    /// starts.
    pub max_retries: u32,
    /// Initial delay between retries; doubles per attempt.
    pub retry_initial_backoff_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: PathBuf::from("executor.py"),
            workdir: None,
            timeout_secs: 300,
            max_retries: 2,
            retry_initial_backoff_ms: 500,
        }
    }
}

/// Settings for the worker pool and the recovery sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    /// Number of concurrent worker loops.
    pub workers: usize,
    /// Bound of the dispatch queue; a full queue leaves tasks pending for
    /// the sweeper.
    pub queue_capacity: usize,
    /// Duration of the processing lease a worker takes on a task.
    pub lease_secs: u64,
    /// How often the recovery sweeper scans for stalled work.
    pub sweep_interval_secs: u64,
    /// Age after which an untouched pending task is considered stalled.
    pub stale_pending_secs: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 100,
            lease_secs: 600,
            sweep_interval_secs: 60,
            stale_pending_secs: 600,
        }
    }
}

/// Settings for the task store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base directory for persisted task records. Defaults to the platform
    /// data directory under `courier`.
    pub data_dir: Option<PathBuf>,
}

impl StorageSettings {
    /// Resolves the effective data directory.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("courier"))
            .unwrap_or_else(|| PathBuf::from(".courier"))
    }
}

impl CourierConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CourierError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the given path, falling back to defaults
    /// when no path is supplied or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    /// Rejects configurations the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.dispatcher.queue_capacity == 0 {
            return Err(CourierError::config(
                "dispatcher.queue_capacity must be at least 1",
            ));
        }
        if self.bridge.timeout_secs == 0 {
            return Err(CourierError::config("bridge.timeout_secs must be at least 1"));
        }
        if self.dispatcher.lease_secs == 0 {
            return Err(CourierError::config("dispatcher.lease_secs must be at least 1"));
        }
        Ok(())
    }
}
