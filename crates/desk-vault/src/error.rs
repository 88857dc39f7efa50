//! Vault error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Passphrase does not meet the minimum length requirement.
    #[error("encryption passphrase must be at least {min} characters")]
    WeakPassphrase { min: usize },

    /// Blob is not three colon-delimited hex segments of the expected sizes.
    #[error("malformed key blob: {0}")]
    MalformedBlob(String),

    /// AEAD seal failed.
    #[error("key encryption failed")]
    EncryptionFailure,

    /// Authentication tag did not verify; the blob is corrupt or tampered.
    #[error("key decryption failed: authentication tag mismatch")]
    DecryptionFailure,

    /// Key derivation function failed.
    #[error("key derivation failed: {0}")]
    Kdf(String),

    /// Decrypted bytes are not a valid secp256k1 private key.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// Decrypted key does not correspond to the identity's address.
    #[error("address mismatch: expected {expected}, derived {actual}")]
    AddressMismatch { expected: String, actual: String },
}

pub type VaultResult<T> = Result<T, VaultError>;
