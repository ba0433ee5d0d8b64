pub mod config;
pub mod datamodel;
pub mod engine;
pub mod error;
pub mod execute;
pub mod health;
pub mod logging;
pub mod model;
pub mod server;
pub mod settings;
pub mod state;

pub use config::{CliArgs, ServerConfig};
pub use error::{ErrorCode, ErrorResponse};
pub use logging::{LoggingConfig, init_logging};
pub use model::{ExecuteRequest, ExecuteResponse, Problem, ProblemField};
pub use server::build_router;
pub use state::AppState;

use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()));

    tracing::info!(
        bind = %config.http_bind_address,
        render_workers = config.render_workers,
        max_output_len = config.max_output_len,
        "starting tera playground server",
    );

    let router = build_router(state);
    let listener = TcpListener::bind(config.http_bind_address).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(bind = %actual_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!(?error, "failed to listen for shutdown signal");
            } else {
                tracing::info!("shutdown signal received");
            }
        })
        .await
        .map_err(anyhow::Error::from)
}
