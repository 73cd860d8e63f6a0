//! Wire format for the Pairlink protocol.
//!
//! Every protocol step is one [`Package`]: a 5-byte header (type tag plus
//! big-endian payload length) followed by the payload. The header is enough to
//! dispatch on [`PackageType`] and to reject oversized payloads before reading
//! them, so receivers never buffer more than their configured limit.
//!
//! Once a session key exists, request and response data only travel as a
//! [`CryptMessage`]: an AES-GCM sealed, CBOR encoded [`Message`].
//!
//! # Security
//!
//! Header parsing uses `zerocopy` layouts. Unknown type tags are rejected
//! outright. The payload limit is enforced by the reader, not the sender.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod control;
pub mod data;
pub mod errors;
pub mod message;
pub mod package;

pub use control::{Rejection, ResumeVerdict};
pub use data::Data;
pub use errors::{ProtocolError, Result};
pub use message::{CryptMessage, Message};
pub use package::{Package, PackageHeader, PackageType};
