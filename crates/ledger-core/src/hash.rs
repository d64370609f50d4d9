use crate::block::Block;
use sha2::{Digest, Sha256};

/// Digest over a block's canonical encoding, rendered as lowercase hex.
pub trait BlockHasher: Send + Sync {
    fn compute_hash_with_nonce(&self, block: &Block, nonce: u64) -> String;

    /// Same as [`compute_hash_with_nonce`](Self::compute_hash_with_nonce) with the
    /// block's stored nonce.
    fn compute_hash(&self, block: &Block) -> String {
        self.compute_hash_with_nonce(block, block.nonce())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl BlockHasher for Sha256Hasher {
    fn compute_hash_with_nonce(&self, block: &Block, nonce: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(block.canonical_bytes(nonce));
        hex::encode(hasher.finalize())
    }
}
