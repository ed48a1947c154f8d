//! Courier command line.
//!
//! Operates the delegation core against a shared data directory: `submit`,
//! `status`, and `list` are the client side, `work` runs the worker pool and
//! recovery sweeper as a daemon. Submissions made by a short-lived `submit`
//! process are picked up by a running (or later-started) `work` process
//! through the store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use courier_application::{SubmissionService, TaskQueryService, TaskRequest};
use courier_bridge::{Bridge, ExecutorClient, ResilientBridge};
use courier_core::task::TaskRepository;
use courier_core::CourierConfig;
use courier_execution::sweeper::sweep_once;
use courier_execution::{Dispatcher, DispatcherConfig, RecoverySweeper, SweeperConfig};
use courier_infrastructure::JsonDirTaskRepository;

#[derive(Parser)]
#[command(name = "courier")]
#[command(
    about = "Courier - asynchronous delegation core for long-running GenAI computations",
    long_about = None
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the task store directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a task and print its ticket
    Submit {
        /// Task kind: document-ingest, research, resume-analysis, or
        /// query-translation
        #[arg(long)]
        kind: String,

        /// Kind-specific input as a JSON object
        #[arg(long)]
        input: String,

        #[arg(long, default_value = "local")]
        owner: String,

        /// Run the task in-process and wait for its terminal state
        #[arg(long)]
        wait: bool,
    },
    /// Print a task record as JSON
    Status {
        task_id: String,

        #[arg(long, default_value = "local")]
        owner: String,
    },
    /// List an owner's tasks, newest first
    List {
        #[arg(long, default_value = "local")]
        owner: String,
    },
    /// Process pending tasks until interrupted
    Work,
}

fn build_bridge(config: &CourierConfig) -> Arc<dyn Bridge> {
    Arc::new(ResilientBridge::from_settings(
        ExecutorClient::from_settings(&config.bridge),
        &config.bridge,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = CourierConfig::load_or_default(cli.config.as_deref())?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.resolve_data_dir());
    let repo: Arc<dyn TaskRepository> = Arc::new(JsonDirTaskRepository::new(&data_dir).await?);

    match cli.command {
        Commands::Submit {
            kind,
            input,
            owner,
            wait,
        } => submit(&config, repo, kind, input, owner, wait).await,
        Commands::Status { task_id, owner } => {
            let task = TaskQueryService::new(repo).status(&owner, &task_id).await?;
            println!("{}", serde_json::to_string_pretty(&task)?);
            Ok(())
        }
        Commands::List { owner } => {
            let tasks = TaskQueryService::new(repo).list(&owner).await?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
            Ok(())
        }
        Commands::Work => work(&config, repo, &data_dir).await,
    }
}

async fn submit(
    config: &CourierConfig,
    repo: Arc<dyn TaskRepository>,
    kind: String,
    input: String,
    owner: String,
    wait: bool,
) -> Result<()> {
    let input: serde_json::Value =
        serde_json::from_str(&input).context("--input must be a JSON object")?;

    // Without --wait the task is only admitted here; a `courier work`
    // process executes it.
    let workers = if wait { config.dispatcher.workers.max(1) } else { 0 };
    let dispatcher = Dispatcher::start(
        DispatcherConfig {
            workers,
            ..DispatcherConfig::from_settings(&config.dispatcher)
        },
        repo.clone(),
        build_bridge(config),
    );

    let submission = SubmissionService::new(repo.clone(), dispatcher.clone());
    let ticket = submission.submit(&owner, TaskRequest { kind, input }).await?;
    println!("{}", serde_json::to_string_pretty(&ticket)?);

    if wait {
        let query = TaskQueryService::new(repo);
        loop {
            let task = query.status(&owner, &ticket.task_id).await?;
            if task.is_terminal() {
                println!("{}", serde_json::to_string_pretty(&task)?);
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    dispatcher.shutdown().await;
    Ok(())
}

async fn work(
    config: &CourierConfig,
    repo: Arc<dyn TaskRepository>,
    data_dir: &std::path::Path,
) -> Result<()> {
    let dispatcher = Dispatcher::start(
        DispatcherConfig::from_settings(&config.dispatcher),
        repo.clone(),
        build_bridge(config),
    );

    // Catch-up pass: requeue everything left unfinished by previous runs,
    // regardless of age. Live leases are respected.
    let recovered = sweep_once(repo.as_ref(), &dispatcher, chrono::Duration::zero()).await?;
    if recovered > 0 {
        info!(recovered, "requeued unfinished tasks from previous runs");
    }

    let sweeper = RecoverySweeper::start(
        SweeperConfig::from_settings(&config.dispatcher),
        repo.clone(),
        dispatcher.clone(),
    );

    info!(data_dir = %data_dir.display(), "courier worker running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    sweeper.shutdown().await;
    dispatcher.shutdown().await;
    Ok(())
}
