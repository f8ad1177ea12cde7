//! # crumbtrail-server
//!
//! Records a position trail and serves it over HTTP.
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package crumbtrail-server
//!
//! # Production
//! CRUMBTRAIL_ENV=production ./crumbtrail-server
//! ```
//!
//! `CRUMBTRAIL_CONFIG` selects the configuration file and `CRUMBTRAIL_PORT`
//! the listening port (default 3000).

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use crumbtrail_core::Config;
use crumbtrail_server::{api, logging, state::AppState};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init(logging::LogMode::from_env())?;

    info!("Starting crumbtrail-server");

    let config_path = Config::default_path()?;
    let config = Config::load_or_default(&config_path)?;
    info!(
        path = %config_path.display(),
        update_interval_ms = config.tracking.update_interval_ms,
        "Configuration loaded"
    );

    let state = AppState::new(&config)?;
    state.session().start();

    let app = api::create_router(state.clone()).layer(TraceLayer::new_for_http());

    let port = match std::env::var("CRUMBTRAIL_PORT") {
        Ok(value) => value.parse()?,
        Err(_) => DEFAULT_PORT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session().stop();
    info!("Recorder stopped, exiting");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
