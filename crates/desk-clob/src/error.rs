//! CLOB venue error types.

use desk_core::ExecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClobError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("unexpected venue response: {0}")]
    Response(String),

    #[error("request authentication failed: {0}")]
    Auth(String),
}

pub type ClobResult<T> = Result<T, ClobError>;

impl From<ClobError> for ExecError {
    fn from(err: ClobError) -> Self {
        ExecError::Venue(err.to_string())
    }
}
