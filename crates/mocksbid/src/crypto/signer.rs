//! Compact JWS signing of device payloads.

use std::fmt;
use std::fs;

use camino::Utf8Path;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::Ed25519KeyPair;
use serde_json::Value;

use super::CryptoError;

/// Produces compact signed strings over JSON payloads.
pub trait Signer: Send + Sync {
    /// Signs `claims`, returning `header.payload.signature`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] when signing fails.
    fn sign(&self, claims: &Value) -> Result<String, CryptoError>;
}

/// Ed25519 signer producing `EdDSA` JWS strings.
pub struct Ed25519Signer {
    key: EncodingKey,
    header: Header,
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("alg", &self.header.alg)
            .finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    fn with_key(key: EncodingKey) -> Self {
        Self {
            key,
            header: Header::new(Algorithm::EdDSA),
        }
    }

    /// Generates a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] when the system RNG or key parsing fails.
    pub fn generate() -> Result<Self, CryptoError> {
        let rng = SystemRandom::new();
        let document = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|_| CryptoError::primitive("ed25519 key generation"))?;
        Self::from_pkcs8(document.as_ref())
    }

    /// Loads a PKCS#8 key from DER bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyRejected`] when the bytes are not an
    /// Ed25519 PKCS#8 document.
    pub fn from_pkcs8(der: &[u8]) -> Result<Self, CryptoError> {
        Ed25519KeyPair::from_pkcs8_maybe_unchecked(der)?;
        Ok(Self::with_key(EncodingKey::from_ed_der(der)))
    }

    /// Loads a PKCS#8 key from a PEM or DER file.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] when the file cannot be read or decoded.
    pub fn from_file(path: &Utf8Path) -> Result<Self, CryptoError> {
        let bytes = fs::read(path).map_err(|source| CryptoError::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
        if !bytes.starts_with(b"-----BEGIN") {
            return Self::from_pkcs8(&bytes);
        }
        let key = EncodingKey::from_ed_pem(&bytes).map_err(|source| CryptoError::KeyFormat {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_key(key))
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, claims: &Value) -> Result<String, CryptoError> {
        Ok(jsonwebtoken::encode(&self.header, claims, &self.key)?)
    }
}
