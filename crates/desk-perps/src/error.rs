//! Perp venue error types.

use desk_core::ExecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerpsError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("unexpected venue response: {0}")]
    Response(String),

    #[error("action signing failed: {0}")]
    Signing(String),
}

pub type PerpsResult<T> = Result<T, PerpsError>;

impl From<PerpsError> for ExecError {
    fn from(err: PerpsError) -> Self {
        ExecError::Venue(err.to_string())
    }
}
