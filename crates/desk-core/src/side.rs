//! Trading side enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self, OrderSide::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Outcome selection on a binary prediction market.
///
/// Selection is purely positional: every market exposes exactly two outcome
/// tokens, index 0 for the affirmative and index 1 for the negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSide {
    Yes,
    No,
}

impl OutcomeSide {
    /// Positional index into the market's outcome token list.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            OutcomeSide::Yes => 0,
            OutcomeSide::No => 1,
        }
    }
}

impl fmt::Display for OutcomeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeSide::Yes => write!(f, "Yes"),
            OutcomeSide::No => write!(f, "No"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_side_index_positional() {
        assert_eq!(OutcomeSide::Yes.index(), 0);
        assert_eq!(OutcomeSide::No.index(), 1);
    }
}
