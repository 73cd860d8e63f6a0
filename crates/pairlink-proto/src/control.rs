//! Control payloads: resume verdicts and error-package rejections.
//!
//! Both travel in plaintext. A rejection is sent exactly when the responder
//! cannot (or will not) answer under the session key, so it cannot be
//! encrypted with it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    package::{Package, PackageType},
};

/// Responder's answer to a resume challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeVerdict {
    /// Challenge decrypted under the responder's key
    Possible,
    /// Challenge did not decrypt; initiator must handshake again
    Impossible,
}

impl ResumeVerdict {
    /// Verdict for a challenge outcome.
    pub fn from_outcome(decrypted: bool) -> Self {
        if decrypted { Self::Possible } else { Self::Impossible }
    }

    /// Encode as a Resume package.
    pub fn to_package(self) -> Package {
        let byte = match self {
            Self::Possible => 0x01,
            Self::Impossible => 0x00,
        };
        Package::new(PackageType::Resume, vec![byte])
    }

    /// Parse a Resume reply payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        match payload {
            [0x01] => Ok(Self::Possible),
            [0x00] => Ok(Self::Impossible),
            other => Err(ProtocolError::InvalidVerdict(other.to_vec())),
        }
    }
}

/// Body of an Error package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// Exchange payload did not decrypt under the responder's key
    Decrypt,
    /// No handler registered for the topic
    UnsupportedTopic {
        /// Requested topic
        topic: String,
    },
    /// Handshake public key could not be used
    InvalidKey,
    /// Any other protocol violation
    Protocol {
        /// Human-readable reason
        reason: String,
    },
}

impl Rejection {
    /// Encode as an Error package.
    pub fn to_package(&self) -> Result<Package> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf).map_err(ProtocolError::encode)?;
        Ok(Package::new(PackageType::Error, buf))
    }

    /// Parse an Error package payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(payload).map_err(ProtocolError::decode)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decrypt => f.write_str("peer could not decrypt the exchange"),
            Self::UnsupportedTopic { topic } => write!(f, "unsupported topic: {topic}"),
            Self::InvalidKey => f.write_str("peer rejected the handshake public key"),
            Self::Protocol { reason } => write!(f, "protocol violation: {reason}"),
        }
    }
}
