use crate::config::ServerConfig;
use crate::engine::RenderEngine;
use std::sync::Arc;

/// Shared per-process state: the resolved configuration and the one
/// rendering engine all requests dispatch through.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub engine: RenderEngine,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let engine = RenderEngine::new(config.render_workers, config.max_output_len);
        Self { config, engine }
    }
}
