//! Logical request/response envelope and its encrypted form.

use pairlink_crypto::CipherKey;
use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Request or response.
///
/// Requests carry `topic` and `content`. Responses carry `content` on success
/// or `error` with the handler's error message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Routing key
    pub topic: String,
    /// Opaque payload
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
    /// Handler error message, if any
    pub error: Option<String>,
}

impl Message {
    /// Request for `topic`.
    pub fn request(topic: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), content: content.into(), error: None }
    }

    /// Successful response.
    pub fn reply(topic: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { topic: topic.into(), content: content.into(), error: None }
    }

    /// Failed response.
    pub fn failure(topic: impl Into<String>, error: impl Into<String>) -> Self {
        Self { topic: topic.into(), content: Vec::new(), error: Some(error.into()) }
    }

    /// CBOR encoding.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf).map_err(ProtocolError::encode)?;
        Ok(buf)
    }

    /// Parse CBOR.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes).map_err(ProtocolError::decode)
    }

    /// Encode and encrypt under `key`.
    pub fn seal(&self, key: &CipherKey) -> Result<CryptMessage> {
        let plaintext = self.to_cbor()?;
        Ok(CryptMessage(key.encrypt(&plaintext)?))
    }
}

/// `nonce || ciphertext` of a CBOR encoded [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptMessage(Vec<u8>);

impl CryptMessage {
    /// Decrypt and decode under `key`.
    pub fn open(&self, key: &CipherKey) -> Result<Message> {
        let plaintext = key.decrypt(&self.0)?;
        Message::from_cbor(&plaintext)
    }

    /// Sealed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into sealed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for CryptMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for CryptMessage {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
