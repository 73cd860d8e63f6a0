//! Cryptographic primitives for the Pairlink protocol.
//!
//! Two primitives, nothing else:
//!
//! - [`CipherKey`]: a 16-byte AES-128-GCM key that encrypts every message body
//!   once a session is established. Each call to [`CipherKey::encrypt`] draws a
//!   fresh random nonce and prepends it to the ciphertext.
//! - [`KeyPair`]: a 2048-bit RSA key pair whose only job is wrapping a
//!   [`CipherKey`] for transport during the handshake (OAEP with SHA-256).
//!   Message bodies are never encrypted with RSA.
//!
//! # Security
//!
//! A [`CipherKey`] only ever crosses the wire wrapped by the peer's public key.
//! Key material is zeroized on drop.

#![forbid(unsafe_code)]

pub mod cipher;
pub mod error;
pub mod keypair;

pub use cipher::{CipherKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::CryptoError;
pub use keypair::{KeyPair, PrivateKey, PublicKey, RSA_BITS};
