//! Symmetric session cipher.
//!
//! Wire layout of a sealed value:
//!
//! ```text
//! +-----------+------------------------+----------+
//! | nonce     | ciphertext             | GCM tag  |
//! | 12 bytes  | len(plaintext) bytes   | 16 bytes |
//! +-----------+------------------------+----------+
//! ```
//!
//! Nonces are random per call, which is the only reuse-prevention mechanism:
//! a (key, nonce) pair is never produced twice in practice because nothing
//! else chooses nonces.

use std::fmt;

use aes_gcm::{
    Aes128Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use md5::Md5;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// AES-128 key size in bytes
pub const KEY_SIZE: usize = 16;

/// GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Random seed length fed into key derivation
const SEED_SIZE: usize = 10;

/// Symmetric key shared by a client/server pair.
///
/// Derived as `MD5(SHA-256(seed))` over 10 random bytes, which yields exactly
/// the 16 bytes AES-128 needs.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_SIZE]);

impl CipherKey {
    /// Generate a fresh key from OS randomness.
    pub fn generate() -> Self {
        let mut seed = [0u8; SEED_SIZE];
        OsRng.fill_bytes(&mut seed);
        let key = Self::derive(&seed);
        seed.zeroize();
        key
    }

    /// Derive a key from seed material.
    pub fn derive(seed: &[u8]) -> Self {
        let first = Sha256::digest(seed);
        let second = Md5::digest(first);

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&second);
        Self(key)
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse key bytes of unknown length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: bytes.len() }
        })?;
        Ok(Self(key))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes128Gcm::new_from_slice(&self.0).map_err(|_| {
            CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: self.0.len() }
        })?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a value produced by [`CipherKey::encrypt`].
    ///
    /// Fails on inputs shorter than nonce + tag and on any tag mismatch.
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let min = NONCE_SIZE + TAG_SIZE;
        if sealed.len() < min {
            return Err(CryptoError::Malformed { len: sealed.len(), min });
        }

        let cipher = Aes128Gcm::new_from_slice(&self.0).map_err(|_| {
            CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: self.0.len() }
        })?;

        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| CryptoError::Decrypt)
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(..)")
    }
}
