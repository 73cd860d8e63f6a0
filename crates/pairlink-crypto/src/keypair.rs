//! RSA key wrapping for the handshake.
//!
//! The initiator sends its [`PublicKey`] (PKCS#1 DER) in the clear; the
//! responder wraps its [`CipherKey`] with it using OAEP/SHA-256. Both peers must
//! agree on the digest, so it is fixed here rather than configurable.

use std::fmt;

use rand::rngs::OsRng;
use rsa::{
    Oaep, RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey},
};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{cipher::CipherKey, error::CryptoError};

/// RSA modulus size in bits
pub const RSA_BITS: usize = 2048;

/// Public half, safe to send in the clear.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Wrap a cipher key for the holder of the matching private key.
    pub fn wrap_key(&self, key: &CipherKey) -> Result<Vec<u8>, CryptoError> {
        self.0
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(CryptoError::Wrap)
    }

    /// Encode as PKCS#1 DER for the handshake payload.
    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        let document = self
            .0
            .to_pkcs1_der()
            .map_err(|e| CryptoError::PublicKeyEncoding(e.to_string()))?;
        Ok(document.as_bytes().to_vec())
    }

    /// Decode from PKCS#1 DER.
    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        RsaPublicKey::from_pkcs1_der(bytes)
            .map(Self)
            .map_err(|e| CryptoError::PublicKeyEncoding(e.to_string()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PublicKey(rsa)")
    }
}

/// Private half. Never leaves the process.
pub struct PrivateKey(RsaPrivateKey);

impl PrivateKey {
    /// Recover a cipher key wrapped by [`PublicKey::wrap_key`].
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<CipherKey, CryptoError> {
        let bytes =
            Zeroizing::new(self.0.decrypt(Oaep::new::<Sha256>(), wrapped).map_err(CryptoError::Unwrap)?);
        CipherKey::from_slice(&bytes)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Key pair generated once per endpoint.
#[derive(Debug)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a 2048-bit pair.
    ///
    /// Slow (tens of milliseconds with optimized dependencies), so endpoints
    /// do this once at construction.
    pub fn generate() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS).map_err(CryptoError::KeyGeneration)?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private: PrivateKey(private), public: PublicKey(public) })
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_inverts_wrap() {
        let pair = KeyPair::generate().unwrap();
        let key = CipherKey::generate();

        let wrapped = pair.public_key().wrap_key(&key).unwrap();
        assert_ne!(wrapped.as_slice(), key.as_bytes().as_slice());
        assert_eq!(wrapped.len(), RSA_BITS / 8);

        let unwrapped = pair.private_key().unwrap_key(&wrapped).unwrap();
        assert_eq!(unwrapped, key);
    }

    #[test]
    fn foreign_private_key_cannot_unwrap() {
        let alice = KeyPair::generate().unwrap();
        let mallory = KeyPair::generate().unwrap();
        let key = CipherKey::generate();

        let wrapped = alice.public_key().wrap_key(&key).unwrap();
        let result = mallory.private_key().unwrap_key(&wrapped);
        assert!(matches!(result, Err(CryptoError::Unwrap(_))));
    }

    #[test]
    fn public_key_der_round_trip() {
        let pair = KeyPair::generate().unwrap();
        let der = pair.public_key().to_der().unwrap();
        let decoded = PublicKey::from_der(&der).unwrap();
        assert_eq!(&decoded, pair.public_key());

        // A key decoded from the wire still wraps for the original owner
        let key = CipherKey::generate();
        let wrapped = decoded.wrap_key(&key).unwrap();
        assert_eq!(pair.private_key().unwrap_key(&wrapped).unwrap(), key);
    }

    #[test]
    fn garbage_public_key_rejected() {
        let result = PublicKey::from_der(b"not a key");
        assert!(matches!(result, Err(CryptoError::PublicKeyEncoding(_))));
    }
}
