//! Hash chain binding each biometric block to the blocks before it.

use sha2::{Digest, Sha256};

/// Rolling SHA-256 chain over the raw values of one capture response.
///
/// Each link is `SHA256(SHA256(previous) || SHA256(value))`, where
/// `previous` is the prior link's digest, or empty for the first block.
#[derive(Debug, Clone, Default)]
pub struct RollingHash {
    previous: Vec<u8>,
}

impl RollingHash {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the chain with `value` and returns the new link as upper hex.
    pub fn link(&mut self, value: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Sha256::digest(&self.previous));
        hasher.update(Sha256::digest(value));
        let digest = hasher.finalize();
        self.previous = digest.to_vec();
        hex::encode_upper(digest)
    }

    /// Restarts the chain, as after a block that carried no value.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}
