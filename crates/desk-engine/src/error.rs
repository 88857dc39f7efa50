//! Engine-level error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vault error: {0}")]
    Vault(#[from] desk_vault::VaultError),

    #[error("Execution error: {0}")]
    Exec(#[from] desk_core::ExecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
