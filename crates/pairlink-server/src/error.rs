//! Server error types.

use std::io;

use pairlink_core::{ConnectionError, SessionError};
use pairlink_crypto::CryptoError;
use pairlink_proto::ProtocolError;
use thiserror::Error;

/// Errors from the listener or from one connection's session.
///
/// Connection-level variants end that connection only; the accept loop logs
/// them and keeps serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("bind: {0}")]
    Bind(#[source] io::Error),

    /// Accepting a connection failed
    #[error("accept: {0}")]
    Accept(#[source] io::Error),

    /// Package I/O failed
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Client broke the protocol sequence
    #[error("session: {0}")]
    Session(#[from] SessionError),

    /// Client key or payload was unusable
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// Payload could not be decoded or encoded
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// Request named a topic with no handler
    #[error("unsupported topic: {0}")]
    UnsupportedTopic(String),

    /// Client skipped the handshake while the server holds no key
    #[error("no session key established")]
    NoKey,
}
