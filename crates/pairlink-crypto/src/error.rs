//! Crypto error types.

use thiserror::Error;

/// Errors from symmetric encryption and asymmetric key wrapping.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption failed
    #[error("encryption failed")]
    Encrypt,

    /// AEAD tag mismatch: wrong key or tampered ciphertext
    #[error("decryption failed: authentication tag mismatch")]
    Decrypt,

    /// Sealed input too short to hold a nonce and a tag
    #[error("malformed ciphertext: {len} bytes, need at least {min}")]
    Malformed {
        /// Actual input length
        len: usize,
        /// Minimum valid length
        min: usize,
    },

    /// Key material of the wrong length
    #[error("invalid cipher key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required length
        expected: usize,
        /// Provided length
        actual: usize,
    },

    /// RSA key pair generation failed
    #[error("key pair generation failed: {0}")]
    KeyGeneration(#[source] rsa::Error),

    /// Wrapping a cipher key with a public key failed
    #[error("key wrap failed: {0}")]
    Wrap(#[source] rsa::Error),

    /// Unwrapping with the private key failed (padding or digest mismatch)
    #[error("key unwrap failed: {0}")]
    Unwrap(#[source] rsa::Error),

    /// Public key could not be encoded or decoded
    #[error("public key encoding: {0}")]
    PublicKeyEncoding(String),
}
