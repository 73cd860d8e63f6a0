//! Package envelope.
//!
//! ```text
//! +--------+----------------+-------------------+
//! | type   | payload length | payload           |
//! | 1 byte | u32 big-endian | length bytes      |
//! +--------+----------------+-------------------+
//! ```

use bytes::{BufMut, Bytes};
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    byteorder::{BigEndian, U32},
};

use crate::errors::{ProtocolError, Result};

/// Package kind, one per protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PackageType {
    /// Public key out, wrapped cipher key back
    Handshake = 0,
    /// Encrypted challenge out, verdict back
    Resume = 1,
    /// Encrypted request out, encrypted response back
    Exchange = 2,
    /// Plaintext rejection, responder to initiator only
    Error = 3,
}

impl PackageType {
    /// Parse a type tag.
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Handshake),
            1 => Some(Self::Resume),
            2 => Some(Self::Exchange),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    /// Wire tag.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Fixed-size package header.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct PackageHeader {
    kind: u8,
    size: U32<BigEndian>,
}

impl PackageHeader {
    /// Encoded header size
    pub const SIZE: usize = 5;

    /// Header for a payload of `size` bytes.
    pub fn new(kind: PackageType, size: u32) -> Self {
        Self { kind: kind.to_u8(), size: U32::new(size) }
    }

    /// Parse a header from raw bytes. Does not validate the type tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from_bytes(bytes).map_err(|_| ProtocolError::TruncatedHeader(bytes.len()))
    }

    /// Encoded header.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Declared package type.
    pub fn package_type(&self) -> Result<PackageType> {
        PackageType::from_u8(self.kind).ok_or(ProtocolError::UnsupportedPackage(self.kind))
    }

    /// Declared payload size.
    pub fn payload_size(&self) -> usize {
        self.size.get() as usize
    }

    /// Validate the header against a receiver limit.
    ///
    /// A zero limit disables the size check.
    pub fn validate(&self, limit: usize) -> Result<PackageType> {
        let kind = self.package_type()?;
        let size = self.payload_size();
        if limit > 0 && size > limit {
            return Err(ProtocolError::PayloadTooLarge { size, limit });
        }
        Ok(kind)
    }
}

/// One protocol step on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    kind: PackageType,
    payload: Bytes,
}

impl Package {
    /// Create a package.
    pub fn new(kind: PackageType, payload: impl Into<Bytes>) -> Self {
        Self { kind, payload: payload.into() }
    }

    /// Package type.
    pub fn kind(&self) -> PackageType {
        self.kind
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Header describing this package.
    ///
    /// Payloads are bounded far below `u32::MAX` by every receiver, so the
    /// length is saturated rather than checked.
    pub fn header(&self) -> PackageHeader {
        let size = u32::try_from(self.payload.len()).unwrap_or(u32::MAX);
        PackageHeader::new(self.kind, size)
    }

    /// Append the encoded package to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_slice(&self.header().to_bytes());
        dst.put_slice(&self.payload);
    }

    /// Encoded length.
    pub fn encoded_len(&self) -> usize {
        PackageHeader::SIZE + self.payload.len()
    }
}
