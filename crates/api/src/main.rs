use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tailpress_core::caller::WordPressAgentMatcher;
use tailpress_core::compiler::TailwindCompiler;
use tailpress_core::job::JobHandler;
use tailpress_core::storage::LocalStorage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tailpress_api::config::{LogFormat, ServerConfig};
use tailpress_api::router::build_app_router;
use tailpress_api::state::AppState;
use tailpress_api::telemetry::build_sink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    // --- Tracing ---
    init_tracing(config.log_format);
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = tailpress_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    tailpress_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    tailpress_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Job pipeline ---
    let storage = LocalStorage::open(&config.compiler.storage_root)
        .await
        .context("Failed to open workspace storage")?;
    tracing::info!(root = %storage.root().display(), "Workspace storage ready");

    let compiler = TailwindCompiler::new(
        &config.compiler.binary,
        &config.compiler.version,
        config.compiler.timeout,
    );
    if let Err(e) = compiler.preflight().await {
        // Requests will fail until the binary is installed.
        tracing::warn!(error = %e, "Compiler binary is not ready");
    }

    let (sink, writer_handle) = build_sink(&config.telemetry, pool.clone());
    tracing::info!(mode = ?config.telemetry.mode, "Telemetry sink created");

    let jobs = JobHandler::new(
        Arc::new(storage),
        compiler,
        Arc::new(WordPressAgentMatcher),
        sink,
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        jobs: Arc::new(jobs),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config
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
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The router owned the last sink handle, so the queue is closed and the
    // writer finishes once it has drained.
    if let Some(handle) = writer_handle {
        let limit = Duration::from_secs(config.shutdown_timeout_secs);
        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(())) => tracing::info!("Telemetry writer drained"),
            Ok(Err(e)) => tracing::error!(error = %e, "Telemetry writer task failed"),
            Err(_) => tracing::warn!(
                timeout_secs = config.shutdown_timeout_secs,
                "Telemetry writer did not drain in time, queued records dropped"
            ),
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "tailpress_api=debug,tailpress_core=debug,tailpress_db=debug,tower_http=debug".into()
    });

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix). If a handler cannot
/// be installed that signal source is ignored and the other still works.
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
