//! Encrypted signing-key custody.
//!
//! A [`KeyVault`] encrypts per-user private keys at rest with AES-256-GCM;
//! the symmetric key is derived from a deployment-wide passphrase via scrypt
//! on every decrypt, so no derived key stays resident between operations.
//! [`SigningIdentity`] is the opaque handle executors receive: an address
//! plus the encrypted key blob. Plaintext keys only exist transiently inside
//! one operation's scope and are zeroized on drop.

pub mod error;
pub mod identity;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use identity::SigningIdentity;
pub use vault::KeyVault;
