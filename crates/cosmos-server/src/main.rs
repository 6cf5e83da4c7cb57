//! cosmos-injector binary.
//!
//! Accepts context-broker notifications over HTTP, queues them in a bounded
//! in-memory channel and persists them to HDFS through the transactional
//! sink. Shuts down gracefully on SIGTERM/SIGINT.

use cosmos_server::config;
use cosmos_sink::MemoryChannel;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio::sync::watch;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("COSMOS_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() -> ExitCode {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    cosmos_server::init_logging(&config.logging);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let channel = MemoryChannel::new(config.sink.channel_capacity);
    let runner = match cosmos_server::build_runner(&config, channel.clone()) {
        Ok(runner) => runner,
        Err(err) => {
            tracing::error!(error = %err, "cannot build the HDFS sink");
            return ExitCode::FAILURE;
        }
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind notification endpoint");
            return ExitCode::FAILURE;
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sink_task = tokio::spawn(runner.run(shutdown_rx));

    tracing::info!(%addr, capacity = channel.capacity(), "starting cosmos-injector");

    let app = cosmos_server::app(cosmos_server::AppState { channel });
    let serve = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    // The sink ending on its own means it panicked; stop serving.
    let served = tokio::select! {
        served = serve => served,
        joined = &mut sink_task => {
            if let Err(err) = joined {
                tracing::error!(error = %err, "sink runner terminated abnormally");
            }
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = served {
        tracing::error!(error = %err, "server error");
    }

    let _ = shutdown_tx.send(true);
    match sink_task.await {
        Ok(()) => {
            tracing::info!("cosmos-injector shut down");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "sink runner terminated abnormally");
            ExitCode::FAILURE
        }
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
