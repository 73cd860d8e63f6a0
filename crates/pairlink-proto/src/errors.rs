//! Protocol error types.

use pairlink_crypto::CryptoError;
use thiserror::Error;

/// Result alias for wire-format operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Type tag outside the known [`crate::PackageType`] set
    #[error("unsupported package type: {0:#04x}")]
    UnsupportedPackage(u8),

    /// Declared payload size exceeds the receiver's limit
    #[error("payload too large: {size} > {limit}")]
    PayloadTooLarge {
        /// Declared payload size
        size: usize,
        /// Receiver's limit
        limit: usize,
    },

    /// Header shorter than [`crate::PackageHeader::SIZE`]
    #[error("truncated header: {0} bytes")]
    TruncatedHeader(usize),

    /// Resume verdict byte other than 0 or 1
    #[error("invalid resume verdict: {0:?}")]
    InvalidVerdict(Vec<u8>),

    /// Sealing or opening a message failed
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// CBOR serialization failed
    #[error("encode: {0}")]
    Encode(String),

    /// CBOR deserialization failed
    #[error("decode: {0}")]
    Decode(String),

    /// JSON (de)serialization failed
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    pub(crate) fn encode(e: impl std::fmt::Display) -> Self {
        Self::Encode(e.to_string())
    }

    pub(crate) fn decode(e: impl std::fmt::Display) -> Self {
        Self::Decode(e.to_string())
    }
}
