//! Signing identity handle.

use crate::error::{VaultError, VaultResult};
use crate::vault::KeyVault;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Opaque handle to a custodied signing key.
///
/// Owned by the caller's user-record store; executors receive it per
/// operation, decrypt transiently, and discard the plaintext when the
/// operation's scope ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningIdentity {
    /// Public address derived from the key at generation time.
    pub address: Address,

    /// Encrypted key blob (`nonce:tag:ciphertext`, hex segments).
    pub encrypted_key: String,
}

impl SigningIdentity {
    /// Generate a fresh random key and encrypt it into an identity.
    pub fn generate(vault: &KeyVault) -> VaultResult<Self> {
        let signer = PrivateKeySigner::random();
        let encrypted_key = vault.encrypt(&signer.to_bytes())?;
        debug!(address = %signer.address(), "Generated new signing identity");
        Ok(Self {
            address: signer.address(),
            encrypted_key,
        })
    }

    /// Rehydrate an identity from persisted parts.
    pub fn from_parts(address: Address, encrypted_key: impl Into<String>) -> Self {
        Self {
            address,
            encrypted_key: encrypted_key.into(),
        }
    }

    /// Decrypt into a signer for the duration of one operation.
    ///
    /// Verifies the derived address against the stored one, so a blob that
    /// decrypts cleanly but belongs to another identity is rejected.
    pub fn signer(&self, vault: &KeyVault) -> VaultResult<PrivateKeySigner> {
        let plain = vault.decrypt(&self.encrypted_key)?;
        let signer = PrivateKeySigner::from_slice(plain.as_ref())
            .map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        if signer.address() != self.address {
            return Err(VaultError::AddressMismatch {
                expected: self.address.to_string(),
                actual: signer.address().to_string(),
            });
        }
        Ok(signer)
    }
}
