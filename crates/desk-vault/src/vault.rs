//! AES-256-GCM vault with scrypt key derivation.
//!
//! Blob format: `hex(nonce):hex(tag):hex(ciphertext)` — three hex segments,
//! colon-delimited, order significant. The 16-byte nonce is random per
//! encryption; the 16-byte GCM tag fails the whole decrypt on mismatch, so a
//! tampered blob can never yield altered plaintext.

use crate::error::{VaultError, VaultResult};
use aes_gcm::aead::generic_array::{typenum::U16, GenericArray};
use aes_gcm::aead::Aead;
use aes_gcm::{aes::Aes256, AesGcm, KeyInit};
use alloy::primitives::B256;
use rand::RngCore;
use zeroize::Zeroizing;

/// AES-256-GCM with a 16-byte nonce, matching the stored blob layout.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Fixed KDF salt. The passphrase is deployment-wide configuration; the salt
/// only needs to be stable so existing blobs keep decrypting.
const KDF_SALT: &[u8] = b"salt";

/// scrypt cost parameters: N=2^14, r=8, p=1.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Minimum passphrase length accepted at construction.
pub const MIN_PASSPHRASE_LEN: usize = 32;

/// Symmetric vault for private signing keys.
pub struct KeyVault {
    passphrase: Zeroizing<String>,
}

impl KeyVault {
    /// Create a vault over the configured passphrase.
    ///
    /// # Errors
    /// Returns `VaultError::WeakPassphrase` if the passphrase is shorter
    /// than [`MIN_PASSPHRASE_LEN`] characters.
    pub fn new(passphrase: impl Into<String>) -> VaultResult<Self> {
        let passphrase = passphrase.into();
        if passphrase.len() < MIN_PASSPHRASE_LEN {
            return Err(VaultError::WeakPassphrase {
                min: MIN_PASSPHRASE_LEN,
            });
        }
        Ok(Self {
            passphrase: Zeroizing::new(passphrase),
        })
    }

    /// Derive the 256-bit cipher key. Invoked once per encrypt/decrypt so the
    /// derived key is never held resident between operations.
    fn derive_cipher_key(&self) -> VaultResult<Zeroizing<[u8; KEY_LEN]>> {
        let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
            .map_err(|e| VaultError::Kdf(e.to_string()))?;
        let mut out = Zeroizing::new([0u8; KEY_LEN]);
        scrypt::scrypt(self.passphrase.as_bytes(), KDF_SALT, &params, out.as_mut())
            .map_err(|e| VaultError::Kdf(e.to_string()))?;
        Ok(out)
    }

    /// Encrypt a 32-byte private key into a storable blob.
    pub fn encrypt(&self, plain_key: &B256) -> VaultResult<String> {
        let cipher_key = self.derive_cipher_key()?;
        let cipher = Aes256Gcm16::new(GenericArray::from_slice(cipher_key.as_ref()));

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        // Aead::encrypt appends the tag; split it back out for the blob.
        let mut sealed = cipher
            .encrypt(GenericArray::from_slice(&nonce), plain_key.as_slice())
            .map_err(|_| VaultError::EncryptionFailure)?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(sealed)
        ))
    }

    /// Decrypt a blob back into the 32-byte private key.
    ///
    /// Fails closed: a tag mismatch returns `DecryptionFailure` and never
    /// partially-decrypted data.
    pub fn decrypt(&self, blob: &str) -> VaultResult<Zeroizing<[u8; KEY_LEN]>> {
        let (nonce, tag, ciphertext) = split_blob(blob)?;

        let cipher_key = self.derive_cipher_key()?;
        let cipher = Aes256Gcm16::new(GenericArray::from_slice(cipher_key.as_ref()));

        // Reassemble ciphertext || tag for the AEAD open.
        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plain = cipher
            .decrypt(GenericArray::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| VaultError::DecryptionFailure)?;

        let plain = Zeroizing::new(plain);
        let key: [u8; KEY_LEN] = plain
            .as_slice()
            .try_into()
            .map_err(|_| VaultError::InvalidKey(format!("{} bytes, expected 32", plain.len())))?;
        Ok(Zeroizing::new(key))
    }
}

fn split_blob(blob: &str) -> VaultResult<([u8; NONCE_LEN], Vec<u8>, Vec<u8>)> {
    let mut parts = blob.split(':');
    let (nonce_hex, tag_hex, ct_hex) = match (parts.next(), parts.next(), parts.next(), parts.next())
    {
        (Some(n), Some(t), Some(c), None) => (n, t, c),
        _ => {
            return Err(VaultError::MalformedBlob(
                "expected nonce:tag:ciphertext".to_string(),
            ))
        }
    };

    let nonce_bytes =
        hex::decode(nonce_hex).map_err(|e| VaultError::MalformedBlob(e.to_string()))?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| VaultError::MalformedBlob("nonce must be 16 bytes".to_string()))?;

    let tag = hex::decode(tag_hex).map_err(|e| VaultError::MalformedBlob(e.to_string()))?;
    if tag.len() != TAG_LEN {
        return Err(VaultError::MalformedBlob(
            "tag must be 16 bytes".to_string(),
        ));
    }

    let ciphertext = hex::decode(ct_hex).map_err(|e| VaultError::MalformedBlob(e.to_string()))?;
    Ok((nonce, tag, ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "correct-horse-battery-staple-0123456789";

    fn vault() -> KeyVault {
        KeyVault::new(PASSPHRASE).unwrap()
    }

    fn sample_key() -> B256 {
        B256::from_slice(&[0x42u8; 32])
    }

    #[test]
    fn test_round_trip() {
        let vault = vault();
        let key = sample_key();

        let blob = vault.encrypt(&key).unwrap();
        let decrypted = vault.decrypt(&blob).unwrap();
        assert_eq!(decrypted.as_slice(), key.as_slice());
    }

    #[test]
    fn test_blob_has_three_hex_segments() {
        let vault = vault();
        let blob = vault.encrypt(&sample_key()).unwrap();

        let parts: Vec<&str> = blob.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), NONCE_LEN * 2);
        assert_eq!(parts[1].len(), TAG_LEN * 2);
        assert!(parts.iter().all(|p| hex::decode(p).is_ok()));
    }

    #[test]
    fn test_nonce_is_random_per_encryption() {
        let vault = vault();
        let key = sample_key();

        let blob_a = vault.encrypt(&key).unwrap();
        let blob_b = vault.encrypt(&key).unwrap();
        assert_ne!(blob_a, blob_b);
    }

    #[test]
    fn test_tampered_ciphertext_fails_closed() {
        let vault = vault();
        let blob = vault.encrypt(&sample_key()).unwrap();

        let parts: Vec<&str> = blob.split(':').collect();
        let mut ct = hex::decode(parts[2]).unwrap();
        ct[0] ^= 0x01;
        let tampered = format!("{}:{}:{}", parts[0], parts[1], hex::encode(ct));

        assert!(matches!(
            vault.decrypt(&tampered),
            Err(VaultError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_tampered_tag_fails_closed() {
        let vault = vault();
        let blob = vault.encrypt(&sample_key()).unwrap();

        let parts: Vec<&str> = blob.split(':').collect();
        let mut tag = hex::decode(parts[1]).unwrap();
        tag[15] ^= 0x80;
        let tampered = format!("{}:{}:{}", parts[0], hex::encode(tag), parts[2]);

        assert!(matches!(
            vault.decrypt(&tampered),
            Err(VaultError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let blob = vault().encrypt(&sample_key()).unwrap();

        let other = KeyVault::new("a-completely-different-passphrase-42!").unwrap();
        assert!(matches!(
            other.decrypt(&blob),
            Err(VaultError::DecryptionFailure)
        ));
    }

    #[test]
    fn test_malformed_blob_rejected() {
        let vault = vault();
        assert!(matches!(
            vault.decrypt("not-a-blob"),
            Err(VaultError::MalformedBlob(_))
        ));
        assert!(matches!(
            vault.decrypt("zz:zz:zz"),
            Err(VaultError::MalformedBlob(_))
        ));
        assert!(matches!(
            vault.decrypt("00:11:22:33"),
            Err(VaultError::MalformedBlob(_))
        ));
    }

    #[test]
    fn test_short_passphrase_rejected() {
        assert!(matches!(
            KeyVault::new("too short"),
            Err(VaultError::WeakPassphrase { .. })
        ));
    }
}
