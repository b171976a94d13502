use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use appforge_engine::http::HttpEngine;
use appforge_engine::InvokeConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appforge_api::config::ServerConfig;
use appforge_api::executor::{ExecutorSettings, JobExecutor};
use appforge_api::registry::JobRegistry;
use appforge_api::router::build_app_router;
use appforge_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appforge_api=debug,appforge_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Generation engine ---
    let engine = HttpEngine::new(
        config.jobs.engine_url.clone(),
        Duration::from_secs(config.jobs.engine_timeout_secs),
    )
    .context("Failed to build generation engine client")?;
    tracing::info!(engine_url = %engine.base_url(), "Generation engine client ready");

    // --- Job registry and executor ---
    let registry = Arc::new(JobRegistry::new());
    let executor = JobExecutor::new(
        Arc::clone(&registry),
        Arc::new(engine),
        ExecutorSettings {
            output_root: config.jobs.output_root.clone(),
            invoke: InvokeConfig {
                recursion_limit: config.jobs.recursion_limit,
            },
            max_concurrent: config.jobs.max_concurrent_jobs,
        },
    );
    tracing::info!(
        max_concurrent_jobs = config.jobs.max_concurrent_jobs,
        output_root = %config.jobs.output_root.display(),
        "Job executor started",
    );

    // --- App state ---
    let state = AppState::new(config.clone(), registry, executor.clone());

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining jobs");

    let abandoned = executor
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if abandoned > 0 {
        tracing::warn!(abandoned, "Exiting with jobs still running");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
