//! Opaque payload handed to and returned from handlers.
//!
//! The protocol never looks inside; `Data` only offers ways to put values in
//! and get them back out.

use std::{fmt, net::SocketAddr};

use serde::{Serialize, de::DeserializeOwned};

use crate::errors::{ProtocolError, Result};

/// Request or response payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data {
    bytes: Vec<u8>,
    addr: Option<SocketAddr>,
}

impl Data {
    /// Empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload holding `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into(), addr: None }
    }

    /// Payload holding the CBOR encoding of `value`.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let mut data = Self::new();
        data.set_value(value)?;
        Ok(data)
    }

    /// Replace the raw bytes.
    pub fn set_bytes(&mut self, bytes: impl Into<Vec<u8>>) {
        self.bytes = bytes.into();
    }

    /// Raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Store `value` as CBOR.
    pub fn set_value<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(value, &mut buf).map_err(ProtocolError::encode)?;
        self.bytes = buf;
        Ok(())
    }

    /// Read a CBOR value.
    pub fn value<T: DeserializeOwned>(&self) -> Result<T> {
        ciborium::de::from_reader(self.bytes.as_slice()).map_err(ProtocolError::decode)
    }

    /// Store `value` as JSON.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.bytes = serde_json::to_vec(value)?;
        Ok(())
    }

    /// Read a JSON value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }

    /// Remote peer, set by the server on incoming requests.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Record the remote peer.
    pub fn set_addr(&mut self, addr: SocketAddr) {
        self.addr = Some(addr);
    }

    /// Builder form of [`Data::set_addr`].
    #[must_use]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
