//! Signing, encryption and hashing collaborators.
//!
//! The capture engine only sees the [`Signer`] and [`Encryptor`] traits and
//! the [`RollingHash`] chain. Signing goes through `jsonwebtoken`; the
//! encryption primitives come from `ring`.

mod encryptor;
mod hash;
mod signer;

use std::io;

use camino::Utf8PathBuf;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use encryptor::{EncryptedValue, Encryptor, X25519Encryptor};
pub use hash::RollingHash;
pub use signer::{Ed25519Signer, Signer};

/// Errors raised by the default cryptographic collaborators.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Reading a key file failed.
    #[error("failed to read key file {path}: {source}")]
    KeyRead {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// A PEM key file did not hold an Ed25519 private key.
    #[error("key file {path} is malformed: {source}")]
    KeyFormat {
        path: Utf8PathBuf,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    /// `ring` rejected key material.
    #[error("key rejected: {0}")]
    KeyRejected(String),
    /// The recipient public key has the wrong length.
    #[error("public key must be {expected} bytes, got {actual}")]
    PublicKeyLength { expected: usize, actual: usize },
    /// Encoding a compact JWS failed.
    #[error("signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    /// A primitive failed inside `ring`.
    #[error("{operation} failed")]
    Primitive { operation: &'static str },
}

impl CryptoError {
    pub(crate) const fn primitive(operation: &'static str) -> Self {
        Self::Primitive { operation }
    }
}

impl From<ring::error::KeyRejected> for CryptoError {
    fn from(error: ring::error::KeyRejected) -> Self {
        Self::KeyRejected(error.to_string())
    }
}

/// Upper-case hex SHA-256 of `public_key`.
#[must_use]
pub fn thumbprint(public_key: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(public_key))
}
