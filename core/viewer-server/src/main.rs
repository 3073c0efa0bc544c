//! claude-log-viewer: serves Claude Code session transcripts over HTTP.
//!
//! Reads `~/.claude/projects/` through viewer-core and exposes projects,
//! sessions, threaded transcripts, search and live updates as a JSON API,
//! optionally serving a static frontend alongside.

mod cli;
mod events;
mod logging;
mod routes;

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use viewer_core::config::load_config;
use viewer_core::ViewerConfig;

use cli::Cli;
use routes::AppState;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (mut config, load_error) = match load_config(cli.config.clone()) {
        Ok(config) => (config, None),
        Err(err) => (ViewerConfig::default(), Some(err)),
    };
    config.apply_env();
    cli.apply(&mut config);

    let _logging_guard = logging::init(&config.logging);
    if let Some(err) = load_error {
        warn!(error = %err, "Failed to load config; using defaults");
    }

    let state = Arc::new(AppState::from_config(&config));
    info!(
        projects_dir = %state.storage.projects_dir().display(),
        poll_interval_ms = config.server.poll_interval_ms,
        "Reading Claude Code projects"
    );
    let app = routes::router(state, config.server.static_dir.as_deref());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = %addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!(
        addr = %addr,
        version = env!("CARGO_PKG_VERSION"),
        "claude-log-viewer listening"
    );

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "Server terminated");
        std::process::exit(1);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
