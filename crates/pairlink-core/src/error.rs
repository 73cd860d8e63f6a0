//! Connection and session error types.

use std::io;

use pairlink_proto::{PackageType, ProtocolError};
use thiserror::Error;

use crate::session::SessionState;

/// Errors from package I/O on one connection.
///
/// Every variant is fatal to the connection it came from and to nothing else.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The stream could not be prepared for the exchange
    #[error("preset connection error: {0}")]
    Preset(#[source] io::Error),

    /// The connection deadline elapsed
    #[error("connection deadline exceeded")]
    Timeout,

    /// Peer closed the stream mid-package
    #[error("connection closed by peer")]
    Closed,

    /// Stream I/O failed
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Malformed, unsupported or oversized package
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ConnectionError {
    pub(crate) fn from_read(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof { Self::Closed } else { Self::Io(e) }
    }
}

/// Protocol state machine violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Package of a known type arrived in a state that does not accept it
    #[error("unexpected package type {kind:?} in state {state:?}")]
    UnexpectedPackage {
        /// State when the package arrived
        state: SessionState,
        /// Offending package type
        kind: PackageType,
    },

    /// Operation requires an established session key
    #[error("no session key established in state {0:?}")]
    MissingKey(SessionState),
}
