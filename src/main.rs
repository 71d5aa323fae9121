// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::{routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use instance_manager::{
    aws::load_cloud_clients,
    config::ControllerConfig,
    constants::{
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_NAME, DEFAULT_LEASE_RETRY_PERIOD_SECS,
        DEFAULT_METRICS_ADDR, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::InstanceGroup,
    metrics,
    reconcilers::reconcile_instancegroup,
};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use kube_lease_manager::LeaseManagerBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

/// Instance-group lifecycle controller for EKS clusters.
#[derive(Parser, Debug)]
#[command(name = "instance-manager", version, about)]
struct Args {
    /// Maximum concurrent reconcile workers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Bind address for the Prometheus metrics server
    #[arg(long, default_value = DEFAULT_METRICS_ADDR)]
    metrics_addr: String,

    /// Freshness window for spot-recommendation events, in minutes
    #[arg(long)]
    spot_recommendation_time: Option<i64>,

    /// Path to the controller configuration file
    #[arg(long)]
    controller_config: Option<PathBuf>,

    /// Acquire a leader-election lease before reconciling
    #[arg(long, default_value_t = false)]
    enable_leader_election: bool,

    /// Cloud region override; the provider chain applies otherwise
    #[arg(long)]
    region: Option<String>,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("instance-manager")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to INFO level.
/// Respects `RUST_LOG_FORMAT` environment variable for output format (json or text).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting instance-manager controller");
}

/// Load configuration, layering CLI flags over the config file.
fn load_configuration(args: &Args) -> Result<ControllerConfig> {
    let mut config = ControllerConfig::load(args.controller_config.as_deref())?;
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }
    if let Some(minutes) = args.spot_recommendation_time {
        config.spot_recommendation_minutes = minutes;
    }
    Ok(config)
}

/// Start the Prometheus metrics HTTP server
///
/// # Returns
/// A `JoinHandle` that can be used to monitor the server task
fn start_metrics_server(bind_addr: String) -> tokio::task::JoinHandle<()> {
    info!(bind_address = %bind_addr, path = METRICS_SERVER_PATH, "Starting metrics server");

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(metrics_text) => metrics_text,
                Err(e) => {
                    error!("Failed to gather metrics: {}", e);
                    String::from("# Error gathering metrics\n")
                }
            }
        }

        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("Metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");

        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {e}");
        }
    })
}

/// Block until this replica holds the leader lease.
async fn acquire_leadership(client: Client) -> Result<()> {
    let namespace = std::env::var("POD_NAMESPACE").unwrap_or_else(|_| "kube-system".to_string());
    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("instance-manager-{}", rand::random::<u32>()));

    info!(
        lease = DEFAULT_LEASE_NAME,
        namespace = %namespace,
        identity = %identity,
        "Leader election enabled, waiting to acquire leadership"
    );

    let lease_manager = LeaseManagerBuilder::new(client, DEFAULT_LEASE_NAME)
        .with_namespace(&namespace)
        .with_identity(&identity)
        .with_duration(DEFAULT_LEASE_DURATION_SECS)
        .with_grace(DEFAULT_LEASE_RETRY_PERIOD_SECS)
        .build()
        .await?;

    let (leader_rx, _lease_handle) = lease_manager.watch().await;
    let mut rx = leader_rx.clone();
    while !*rx.borrow_and_update() {
        rx.changed().await?;
    }

    info!("Leadership acquired, starting controller");
    Ok(())
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let args = Args::parse();
    let config = load_configuration(&args)?;

    debug!("Initializing Kubernetes client");
    let kube_config = kube::Config::infer().await?;
    let client = Client::try_from(kube_config)?;

    let cloud = load_cloud_clients(args.region.clone()).await?;
    let context = Arc::new(Context::new(client.clone(), cloud, config));

    let _metrics_handle = start_metrics_server(args.metrics_addr.clone());

    if args.enable_leader_election {
        acquire_leadership(client.clone()).await?;
    } else {
        info!("Leader election disabled, starting controller immediately");
    }

    // Run the controller with signal handling
    let shutdown_result: Result<()> = tokio::select! {
        // Monitor for SIGINT (Ctrl+C)
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            result.map_err(anyhow::Error::from)
        }

        // Monitor for SIGTERM (Kubernetes sends this when deleting pods)
        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                // On non-Unix platforms, just wait forever
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            result
        }

        () = run_controller(context) => {
            error!("CRITICAL: InstanceGroup controller exited unexpectedly");
            anyhow::bail!("InstanceGroup controller exited unexpectedly")
        }
    };

    shutdown_result?;
    info!("Graceful shutdown completed successfully");
    Ok(())
}

/// Run the InstanceGroup controller loop.
async fn run_controller(context: Arc<Context>) {
    let api = Api::<InstanceGroup>::all(context.client.clone());

    Controller::new(api, Config::default().any_semantic())
        .run(reconcile_wrapper, error_policy, context)
        .for_each(|_| futures::future::ready(()))
        .await;
}

/// Reconcile wrapper: bounds concurrency, records metrics, tracks failures.
async fn reconcile_wrapper(
    group: Arc<InstanceGroup>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    // Serialization per key is the runtime's job; the semaphore bounds the
    // number of distinct keys reconciling at once
    let _permit = ctx
        .workers
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ReconcileError(anyhow::Error::new(e)))?;

    let key = format!(
        "{}/{}",
        group.namespace().unwrap_or_default(),
        group.name_any()
    );
    let start = std::time::Instant::now();

    let result = reconcile_instancegroup(ctx.clone(), group).await;
    let duration = start.elapsed();

    match result {
        Ok(action) => {
            metrics::record_reconciliation_success(duration);
            ctx.clear_failures(&key);
            Ok(action)
        }
        Err(err) => {
            error!(group = %key, error = %err, "Reconciliation failed");
            metrics::record_reconciliation_error(duration);
            Err(ReconcileError(err))
        }
    }
}

/// Error policy: transient failures requeue with exponential backoff,
/// capped at the configured ceiling.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(group: Arc<InstanceGroup>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let key = format!(
        "{}/{}",
        group.namespace().unwrap_or_default(),
        group.name_any()
    );
    let delay = ctx.record_failure(&key);
    warn!(
        group = %key,
        error = %err,
        retry_in_secs = delay.as_secs(),
        "Transient reconcile error, backing off"
    );
    Action::requeue(delay)
}
