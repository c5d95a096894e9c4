//! Per-block encryption of biometric values for authentication captures.
//!
//! Every value is sealed with a fresh AES-256-GCM session key. The session
//! key is then wrapped for the recipient with an ephemeral X25519 agreement,
//! HKDF-SHA256 and a second AES-256-GCM seal.

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::agreement::{self, EphemeralPrivateKey, UnparsedPublicKey, X25519};
use ring::hkdf;
use ring::rand::{SecureRandom, SystemRandom};

use super::CryptoError;
use crate::device::Clock;

const SESSION_KEY_LEN: usize = 32;
const AAD_LEN: usize = 16;
const X25519_PUBLIC_KEY_LEN: usize = 32;
pub(crate) const WRAP_INFO: &[u8] = b"mocksbi session key";

/// Encrypted biometric value and the material needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    /// Base64url AES-GCM ciphertext with the tag appended.
    pub cipher_text: String,
    /// Base64url ephemeral public key followed by the sealed session key.
    pub wrapped_key: String,
    /// Timestamp mixed into the nonce and AAD.
    pub timestamp: String,
}

/// Encrypts biometric values for a recipient public key.
pub trait Encryptor: Send + Sync {
    /// Encrypts `data` for `public_key`, binding it to `transaction_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] when the key is unusable or a primitive fails.
    fn encrypt(
        &self,
        public_key: &[u8],
        data: &[u8],
        transaction_id: &str,
    ) -> Result<EncryptedValue, CryptoError>;
}

/// Default [`Encryptor`] built on `ring`.
pub struct X25519Encryptor {
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl fmt::Debug for X25519Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X25519Encryptor").finish_non_exhaustive()
    }
}

impl X25519Encryptor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rng: SystemRandom::new(),
        }
    }

    fn wrap_session_key(
        &self,
        recipient: &[u8],
        session_key: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let ephemeral = EphemeralPrivateKey::generate(&X25519, &self.rng)
            .map_err(|_| CryptoError::primitive("x25519 key generation"))?;
        let ephemeral_public = ephemeral
            .compute_public_key()
            .map_err(|_| CryptoError::primitive("x25519 public key"))?;
        let peer = UnparsedPublicKey::new(&X25519, recipient);
        let wrap_key = agreement::agree_ephemeral(ephemeral, &peer, |shared| {
            derive_wrap_key(ephemeral_public.as_ref(), shared)
        })
        .map_err(|_| CryptoError::primitive("x25519 agreement"))??;

        let mut sealed = session_key.to_vec();
        wrap_key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key([0; NONCE_LEN]),
                Aad::empty(),
                &mut sealed,
            )
            .map_err(|_| CryptoError::primitive("session key wrap"))?;

        let mut wrapped = ephemeral_public.as_ref().to_vec();
        wrapped.extend_from_slice(&sealed);
        Ok(wrapped)
    }
}

impl Encryptor for X25519Encryptor {
    fn encrypt(
        &self,
        public_key: &[u8],
        data: &[u8],
        transaction_id: &str,
    ) -> Result<EncryptedValue, CryptoError> {
        if public_key.len() != X25519_PUBLIC_KEY_LEN {
            return Err(CryptoError::PublicKeyLength {
                expected: X25519_PUBLIC_KEY_LEN,
                actual: public_key.len(),
            });
        }
        let timestamp = self.clock.timestamp();

        let mut session_key = [0_u8; SESSION_KEY_LEN];
        self.rng
            .fill(&mut session_key)
            .map_err(|_| CryptoError::primitive("session key generation"))?;
        let key = LessSafeKey::new(
            UnboundKey::new(&AES_256_GCM, &session_key)
                .map_err(|_| CryptoError::primitive("session key setup"))?,
        );

        let (nonce, aad) = nonce_and_aad(&timestamp, transaction_id);
        let mut sealed = data.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(aad),
            &mut sealed,
        )
        .map_err(|_| CryptoError::primitive("value encryption"))?;

        let wrapped = self.wrap_session_key(public_key, &session_key)?;
        Ok(EncryptedValue {
            cipher_text: URL_SAFE_NO_PAD.encode(sealed),
            wrapped_key: URL_SAFE_NO_PAD.encode(wrapped),
            timestamp,
        })
    }
}

pub(crate) fn derive_wrap_key(salt: &[u8], shared: &[u8]) -> Result<LessSafeKey, CryptoError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(shared);
    let info = [WRAP_INFO];
    let okm = prk
        .expand(&info, &AES_256_GCM)
        .map_err(|_| CryptoError::primitive("hkdf expand"))?;
    Ok(LessSafeKey::new(UnboundKey::from(okm)))
}

/// Nonce and AAD from the right-aligned XOR of timestamp and transaction id.
pub(crate) fn nonce_and_aad(
    timestamp: &str,
    transaction_id: &str,
) -> ([u8; NONCE_LEN], [u8; AAD_LEN]) {
    let mixed = xor_right_aligned(timestamp.as_bytes(), transaction_id.as_bytes());
    let mut padded = vec![0_u8; AAD_LEN.saturating_sub(mixed.len())];
    padded.extend_from_slice(&mixed);

    let mut aad = [0_u8; AAD_LEN];
    aad.copy_from_slice(&padded[padded.len() - AAD_LEN..]);
    let mut nonce = [0_u8; NONCE_LEN];
    nonce.copy_from_slice(&padded[padded.len() - NONCE_LEN..]);
    (nonce, aad)
}

fn xor_right_aligned(left: &[u8], right: &[u8]) -> Vec<u8> {
    let (long, short) = if left.len() >= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let offset = long.len() - short.len();
    let mut mixed = long.to_vec();
    for (index, byte) in short.iter().enumerate() {
        mixed[offset + index] ^= byte;
    }
    mixed
}
