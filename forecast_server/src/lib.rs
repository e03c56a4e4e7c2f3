//! HTTP front end for `forecast_core`
//!
//! Exposes `POST /predict`, which runs one forecast per request on tokio's
//! blocking pool, and `GET /health`.

mod api;
mod config;
mod error;
mod handlers;
mod payload;
mod state;

pub use api::create_router;
pub use config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::ServerError;
pub use payload::{PredictRequest, PredictResponse};
pub use state::AppState;

use tracing::{info, warn};

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let app = create_router(AppState::new(config.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        max_body_bytes = config.max_body_bytes,
        version = forecast_core::VERSION,
        "Forecast server listening"
    );

    let shutdown_signal = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
