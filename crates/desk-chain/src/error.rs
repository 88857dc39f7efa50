//! Chain error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Fee oracle read failed. Fatal for the calling operation; there is no
    /// safe default fee on a fee-market chain.
    #[error("fee oracle read failed: {0}")]
    FeeOracle(String),

    #[error("transaction reverted: {hash}")]
    TxReverted { hash: String },

    /// Provider rejected the transaction for lack of native balance.
    #[error("insufficient native balance for gas fees")]
    InsufficientGas,

    #[error("numeric conversion failed: {0}")]
    Numeric(String),
}

impl ChainError {
    /// Classify a raw provider error message. The RPC layer conflates
    /// several causes into similar strings; this is the one place that
    /// pattern-matches on them.
    pub fn from_provider(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.contains("insufficient funds") {
            ChainError::InsufficientGas
        } else {
            ChainError::Rpc(msg)
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_classified() {
        let err = ChainError::from_provider(
            "server returned an error response: insufficient funds for gas * price + value",
        );
        assert!(matches!(err, ChainError::InsufficientGas));
    }

    #[test]
    fn test_other_errors_stay_rpc() {
        let err = ChainError::from_provider("nonce too low");
        assert!(matches!(err, ChainError::Rpc(_)));
    }
}
