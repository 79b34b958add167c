//! Cryptographic Utilities
//!
//! Keyed hashing for blind indexes, key derivation from a single master
//! secret, and AEAD encryption for confidential columns at rest.

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// AEAD nonce length (96 bits)
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptFailed,

    #[error("Decryption failed or ciphertext corrupted")]
    DecryptFailed,
}

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive a 32-byte subkey from a master secret and a context label
///
/// The same master secret yields independent keys for independent uses
/// (blind index vs. at-rest encryption), so rotating one use never
/// requires re-deriving the other.
pub fn derive_key(master: &[u8], context: &[u8]) -> [u8; 32] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(master).expect("HMAC accepts any key length");
    mac.update(context);
    mac.finalize().into_bytes().into()
}

/// Constant-time comparison to prevent timing attacks
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Keyed one-way hash for blind-index lookups
///
/// HMAC rather than a bare hash so the index of a low-entropy value
/// (an email address) cannot be brute-forced without the key.
#[derive(Clone)]
pub struct BlindIndexer {
    key: [u8; 32],
}

impl BlindIndexer {
    pub fn new(master: &[u8]) -> Self {
        Self {
            key: derive_key(master, b"hash-key"),
        }
    }

    /// Hash a value for index lookup; case-insensitive for email semantics
    pub fn hash(&self, value: &str) -> Vec<u8> {
        let normalized = value.trim().to_lowercase();
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(normalized.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// AEAD encryption for confidential columns
///
/// Produces `nonce (12 bytes) || ciphertext+tag`. A fresh random nonce per
/// encryption; the same plaintext never produces the same ciphertext.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; 32],
}

impl FieldCipher {
    pub fn new(master: &[u8]) -> Self {
        Self {
            key: derive_key(master, b"aead-key"),
        }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < NONCE_LEN {
            return Err(CryptoError::DecryptFailed);
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)
    }

    /// Encrypt a UTF-8 string
    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, CryptoError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt to a UTF-8 string
    pub fn decrypt_str(&self, data: &[u8]) -> Result<String, CryptoError> {
        let plaintext = self.decrypt(data)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptFailed)
    }
}
