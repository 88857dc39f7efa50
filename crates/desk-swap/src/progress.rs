//! Progress milestones emitted while a swap blocks on network calls.
//!
//! A side-channel only: dropping the receiver or passing no sender never
//! changes control flow.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapProgress {
    /// Searching aggregators for a route.
    SearchingRoute { backend: &'static str },

    /// Allowance raise submitted, waiting for confirmation.
    ApprovalPending,

    /// Swap transaction submitted, waiting for confirmation.
    SwapPending,
}

impl fmt::Display for SwapProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SearchingRoute { backend } => write!(f, "Searching for a route via {backend}"),
            Self::ApprovalPending => write!(f, "Waiting for approval confirmation"),
            Self::SwapPending => write!(f, "Waiting for swap confirmation"),
        }
    }
}
