//! msgflow Crypto — at-rest encryption for tenant provider secrets.
//!
//! Provider API keys are stored encrypted under a process-wide master key:
//! - AES-256-GCM with the first 32 bytes of the master key
//! - A fresh random 12-byte nonce per encryption, prepended to the ciphertext
//! - URL-safe base64 without padding as the storage encoding
//! - Key material is wiped on drop (`Zeroize`)

#![forbid(unsafe_code)]

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum master key length in bytes.
pub const MIN_MASTER_KEY_LEN: usize = 32;

/// GCM nonce size in bytes.
const NONCE_LEN: usize = 12;

/// Error types for crypto operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Master key shorter than 32 bytes
    #[error("master key must be at least {MIN_MASTER_KEY_LEN} bytes")]
    KeyTooShort,
    /// Encryption failed
    #[error("encryption failed")]
    EncryptionFailed,
    /// Decryption failed (wrong key, tampered data, or invalid nonce)
    #[error("decryption failed")]
    DecryptionFailed,
    /// Invalid data format
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Cipher bound to a master key.
///
/// Holds only the 32 bytes actually used by AES-256.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    /// Create a cipher from a master key string.
    pub fn new(master_key: &str) -> Result<Self> {
        let bytes = master_key.as_bytes();
        if bytes.len() < MIN_MASTER_KEY_LEN {
            return Err(CryptoError::KeyTooShort);
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        Ok(Self { key })
    }

    /// Encrypt plaintext with a fresh random nonce.
    ///
    /// Encrypting the same plaintext twice produces different output.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::EncryptionFailed)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypt a value produced by [`SecretCipher::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let data = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidFormat(e.to_string()))?;
        if data.len() < NONCE_LEN {
            return Err(CryptoError::InvalidFormat("ciphertext too short".to_string()));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);

        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::DecryptionFailed)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::InvalidFormat(e.to_string()))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt `plaintext` under `master_key`.
pub fn encrypt(master_key: &str, plaintext: &str) -> Result<String> {
    SecretCipher::new(master_key)?.encrypt(plaintext)
}

/// Decrypt `encoded` under `master_key`.
pub fn decrypt(master_key: &str, encoded: &str) -> Result<String> {
    SecretCipher::new(master_key)?.decrypt(encoded)
}
