//! Shared application state

use crate::config::ServerConfig;
use forecast_core::GradientBoostingConfig;

/// Read-only state shared by all handlers.
///
/// Holds configuration only; every request builds its own pipeline.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub config: ServerConfig,
    pub model_config: GradientBoostingConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            model_config: GradientBoostingConfig::default(),
        }
    }

    /// Use a different boosting configuration for every request
    pub fn with_model_config(mut self, model_config: GradientBoostingConfig) -> Self {
        self.model_config = model_config;
        self
    }
}
