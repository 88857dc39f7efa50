//! Core domain types for the crossdesk execution engine.
//!
//! This crate provides the types shared by every venue executor:
//! - `Price`, `Size`: precision-safe numeric types
//! - `OrderSide`, `OutcomeSide`: trading enums
//! - `Fill`, `SwapOutcome`: uniform success results
//! - `ExecError`: the cross-venue error taxonomy

pub mod decimal;
pub mod error;
pub mod outcome;
pub mod side;

pub use decimal::{Price, Size};
pub use error::{ExecError, ExecResult};
pub use outcome::{Fill, SwapOutcome};
pub use side::{OrderSide, OutcomeSide};
