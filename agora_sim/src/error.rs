//! Error types for the simulation harness.

use agora_env::EnvError;
use thiserror::Error;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The environment core reported an error the harness cannot absorb
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    /// Report export or runtime setup failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A concurrent worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}
