use sha2::{Digest, Sha256};

use crate::domain::avatar::{ContentHash, ContentHasher};

/// SHA-256 content hasher producing lowercase hex digests
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn digest(&self, bytes: &[u8]) -> ContentHash {
        ContentHash::from_digest(&Sha256::digest(bytes))
    }

    fn algorithm(&self) -> &'static str {
        "sha256"
    }
}
