use crate::block::Block;
use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::pow::ProofOfWorkEngine;
use crate::signer::BlockSigner;
use std::fmt;
use std::iter::FusedIterator;
use tracing::{debug, warn};

pub const HASH_INVALID: &str = "hash is invalid";
pub const SIGNATURE_INVALID: &str = "signature is invalid";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationResult<'a> {
    pub is_valid: bool,
    pub block: &'a Block,
    pub message: Option<String>,
}

impl<'a> ValidationResult<'a> {
    pub fn success(block: &'a Block) -> Self {
        Self {
            is_valid: true,
            block,
            message: None,
        }
    }

    pub fn failure(block: &'a Block, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            block,
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for ValidationResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.is_valid, &self.message) {
            (true, _) => write!(f, "block {} is valid", self.block.index()),
            (false, Some(message)) => write!(f, "block {}: {message}", self.block.index()),
            (false, None) => write!(f, "block {} is invalid", self.block.index()),
        }
    }
}

/// Checks that `block` sits at `position` and points at `expected_previous`.
pub(crate) fn check_linkage(
    position: u64,
    expected_previous: &str,
    block: &Block,
) -> Result<(), String> {
    if block.index() != position {
        return Err(format!(
            "index mismatch: expected {position}, found {}",
            block.index()
        ));
    }
    if block.previous_hash() != expected_previous {
        return Err(format!(
            "previous hash mismatch: expected {expected_previous}, found {}",
            block.previous_hash()
        ));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Linkage, then hash, then signature.
    FullChain,
    /// Hash and signature only.
    PerBlock,
}

/// Lazily validates a chain one block at a time, in index order.
///
/// Each call to `next` examines exactly one block. The first failing result is
/// the last one emitted.
pub struct ChainValidation<'a> {
    blocks: &'a [Block],
    position: usize,
    previous_hash: &'a str,
    mode: Mode,
    pow: &'a dyn ProofOfWorkEngine,
    signer: Option<&'a dyn BlockSigner>,
    finished: bool,
}

impl<'a> ChainValidation<'a> {
    pub(crate) fn new(
        blocks: &'a [Block],
        mode: Mode,
        pow: &'a dyn ProofOfWorkEngine,
        signer: Option<&'a dyn BlockSigner>,
    ) -> Self {
        Self {
            blocks,
            position: 0,
            previous_hash: GENESIS_PREVIOUS_HASH,
            mode,
            pow,
            signer,
            finished: false,
        }
    }

    fn examine(&self, block: &'a Block) -> ValidationResult<'a> {
        if self.mode == Mode::FullChain {
            if let Err(message) = check_linkage(self.position as u64, self.previous_hash, block) {
                return ValidationResult::failure(block, message);
            }
        }
        if !self.pow.verify(block) {
            return ValidationResult::failure(block, HASH_INVALID);
        }
        // Genesis is exempt by position, whatever its signature field holds.
        if block.index() > 0 {
            if let Some(signer) = self.signer {
                if !signer.verify(block) {
                    return ValidationResult::failure(block, SIGNATURE_INVALID);
                }
            }
        }
        ValidationResult::success(block)
    }
}

impl<'a> Iterator for ChainValidation<'a> {
    type Item = ValidationResult<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let blocks: &'a [Block] = self.blocks;
        let Some(block) = blocks.get(self.position) else {
            self.finished = true;
            return None;
        };

        let result = self.examine(block);
        if result.is_valid {
            debug!(index = block.index(), mode = ?self.mode, "block valid");
        } else {
            warn!(index = block.index(), mode = ?self.mode, "{result}");
            self.finished = true;
        }
        self.previous_hash = block.hash();
        self.position += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            let remaining = self.blocks.len() - self.position;
            (remaining.min(1), Some(remaining))
        }
    }
}

impl FusedIterator for ChainValidation<'_> {}

/// Single pass over index sequencing and previous-hash chaining.
pub(crate) fn check_integrity<'a>(blocks: &'a [Block]) -> Option<ValidationResult<'a>> {
    let mut previous_hash = GENESIS_PREVIOUS_HASH;
    for (position, block) in blocks.iter().enumerate() {
        if let Err(message) = check_linkage(position as u64, previous_hash, block) {
            warn!(index = block.index(), "integrity check failed: {message}");
            return Some(ValidationResult::failure(block, message));
        }
        previous_hash = block.hash();
    }
    blocks.last().map(ValidationResult::success)
}
