//! Orchestration error types

use mill_action_config::ConfigError;
use thiserror::Error;

/// Result type for orchestration operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Request-level errors.
///
/// Provider failures never show up here; they are contained per provider.
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    /// The caller cancelled the request; partial results were discarded
    #[error("Request cancelled")]
    Cancelled,

    /// Engine configuration could not be loaded
    #[error("Orchestrator configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl OrchestratorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
