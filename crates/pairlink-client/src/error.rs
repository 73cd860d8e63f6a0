//! Client error types.

use std::io;

use pairlink_core::{ConnectionError, SessionError};
use pairlink_crypto::CryptoError;
use pairlink_proto::{ProtocolError, Rejection};
use thiserror::Error;

/// Errors surfaced by [`crate::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Dial failed or timed out: the peer is unreachable
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),

    /// Dialed stream could not be prepared
    #[error("preset connection error: {0}")]
    PresetConnection(#[source] io::Error),

    /// Connection dropped, timed out or carried a malformed package
    #[error("transport: {0}")]
    Transport(#[source] ConnectionError),

    /// Peer broke the protocol sequence
    #[error("session: {0}")]
    Session(#[from] SessionError),

    /// Key unwrap or encryption failed
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// Reply could not be decoded or decrypted
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// Server no longer accepts the cached key; next attempt handshakes
    #[error("cipher key error: resumption rejected")]
    CipherKey,

    /// Server answered with an Error package
    #[error("rejected: {0}")]
    Rejected(Rejection),

    /// Handler ran and returned an error
    #[error("remote: {0}")]
    Remote(String),

    /// Retry policy allows no attempts
    #[error("no attempts made: retry count is zero")]
    NoAttempts,

    /// Key pair generation failed at construction
    #[error("setup: {0}")]
    Setup(#[source] CryptoError),
}

impl ClientError {
    /// Whether retrying is pointless because the peer is unreachable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::PresetConnection(_) | Self::Setup(_))
    }

    /// Whether the server answered deliberately, so retrying would get the
    /// same answer.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Rejected(Rejection::UnsupportedTopic { .. }))
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal() && !self.is_terminal() && !matches!(self, Self::NoAttempts)
    }
}

impl From<ConnectionError> for ClientError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::Preset(io) => Self::PresetConnection(io),
            other => Self::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let refused = || io::Error::from(io::ErrorKind::ConnectionRefused);

        assert!(ClientError::Connection(refused()).is_fatal());
        assert!(ClientError::from(ConnectionError::Preset(refused())).is_fatal());

        assert!(ClientError::from(ConnectionError::Timeout).is_retryable());
        assert!(ClientError::CipherKey.is_retryable());
        assert!(ClientError::Rejected(Rejection::Decrypt).is_retryable());

        let unsupported = ClientError::Rejected(Rejection::UnsupportedTopic { topic: "x".into() });
        assert!(unsupported.is_terminal());
        assert!(ClientError::Remote("boom".into()).is_terminal());
        assert!(!ClientError::NoAttempts.is_retryable());
    }
}
