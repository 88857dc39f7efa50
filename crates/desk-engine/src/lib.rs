//! Top-level engine crate: configuration, logging, and component wiring.
//!
//! Consumers (a chat-command layer, a service binary) construct an
//! [`Engine`] from an [`EngineConfig`] and call its operation methods with
//! a [`desk_vault::SigningIdentity`] per request.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;

pub use config::{EngineConfig, Network};
pub use engine::{Engine, WalletBalances};
pub use error::{EngineError, EngineResult};
pub use logging::init_logging;
