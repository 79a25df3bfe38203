use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sales_dashboard::config::Config;
use sales_dashboard::server::{self, AppState};
use sales_dashboard::DatasetStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();

    let store = match DatasetStore::builder()
        .processed(&config.processed)
        .raw(&config.raw)
        .date_format(&config.date_format)
        .load()
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to load dataset: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = Arc::new(AppState::new(store, config.max_sessions));
    let app = server::router(state);

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, "failed to bind: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("listening on http://{addr}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    info!("shut down");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
