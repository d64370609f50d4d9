use crate::block::Block;
use crate::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_MAX_NONCE_ATTEMPTS, DEFAULT_RETARGET_INTERVAL,
    DEFAULT_TARGET_BLOCK_TIME_MS,
};
use crate::error::{LedgerError, Result};
use crate::hash::{BlockHasher, Sha256Hasher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfWorkSettings {
    /// Leading `'0'` hex characters required of new blocks.
    pub difficulty: u32,
    /// Nonces `0..max_nonce_attempts` are tried before giving up.
    pub max_nonce_attempts: u64,
    /// Not consumed by mining or validation.
    pub retarget_interval: u32,
    /// Not consumed by mining or validation.
    pub target_block_time_ms: u64,
}

impl Default for ProofOfWorkSettings {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            max_nonce_attempts: DEFAULT_MAX_NONCE_ATTEMPTS,
            retarget_interval: DEFAULT_RETARGET_INTERVAL,
            target_block_time_ms: DEFAULT_TARGET_BLOCK_TIME_MS,
        }
    }
}

pub trait ProofOfWorkEngine: Send + Sync {
    /// Seal `block` with the smallest nonce whose hash meets its difficulty.
    fn mine(&self, block: Block) -> Result<Block>;

    /// Recompute the hash from the stored nonce and check it both matches the
    /// stored hash and meets the stored difficulty.
    fn verify(&self, block: &Block) -> bool;
}

/// Number of leading `'0'` characters in a hex digest.
pub fn count_leading_zero_chars(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    count_leading_zero_chars(hash) >= difficulty as usize
}

/// Sequential nonce search over a pluggable hasher.
#[derive(Clone)]
pub struct ProofOfWork {
    settings: ProofOfWorkSettings,
    hasher: Arc<dyn BlockHasher>,
}

impl ProofOfWork {
    pub fn new(settings: ProofOfWorkSettings) -> Self {
        Self::with_hasher(settings, Arc::new(Sha256Hasher))
    }

    pub fn with_hasher(settings: ProofOfWorkSettings, hasher: Arc<dyn BlockHasher>) -> Self {
        Self { settings, hasher }
    }

    pub fn settings(&self) -> &ProofOfWorkSettings {
        &self.settings
    }
}

impl ProofOfWorkEngine for ProofOfWork {
    fn mine(&self, block: Block) -> Result<Block> {
        let attempts = self.settings.max_nonce_attempts;
        for nonce in 0..attempts {
            let hash = self.hasher.compute_hash_with_nonce(&block, nonce);
            if meets_difficulty(&hash, block.difficulty()) {
                info!(
                    index = block.index(),
                    nonce,
                    difficulty = block.difficulty(),
                    "mined block {hash}"
                );
                return Ok(block.with_mined(hash, nonce));
            }
        }
        debug!(index = block.index(), attempts, "nonce space exhausted");
        Err(LedgerError::NonceSpaceExhausted {
            index: block.index(),
            attempts,
        })
    }

    fn verify(&self, block: &Block) -> bool {
        let hash = self.hasher.compute_hash_with_nonce(block, block.nonce());
        hash == block.hash() && meets_difficulty(block.hash(), block.difficulty())
    }
}
