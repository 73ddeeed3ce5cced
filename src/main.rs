use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use restyle_server::{app_state::AppState, build_router, config::AppConfig, services::sweeper};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(config = ?config, "Initializing restyle-server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!("restyle_jobs_submitted_total", "Total restyle jobs submitted");
    metrics::describe_counter!("restyle_jobs_completed_total", "Total restyle jobs completed");
    metrics::describe_counter!("restyle_jobs_failed_total", "Total restyle jobs that failed");
    metrics::describe_counter!(
        "restyle_jobs_rate_limited_total",
        "Submissions rejected by the per-client quota"
    );
    metrics::describe_counter!("restyle_jobs_swept_total", "Expired jobs removed by the sweeper");
    metrics::describe_histogram!(
        "restyle_job_processing_seconds",
        "Time from job creation to its terminal state"
    );
    metrics::describe_gauge!("restyle_jobs_live", "Jobs currently held in memory");

    let state = AppState::from_config(&config);

    // Start the expiry sweeper
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(sweeper::run(
        state.jobs.clone(),
        config.sweep_interval(),
        config.job_retention(),
        sweep_cancel.clone(),
    ));

    let app = build_router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    tracing::info!("Server stopped accepting connections, stopping sweeper");
    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Shutdown complete");
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
