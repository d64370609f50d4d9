use crate::block::{current_timestamp_ms, Block};
use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::error::Result;
use crate::pow::{ProofOfWorkEngine, ProofOfWorkSettings};
use crate::signer::BlockSigner;
use crate::validation::{check_integrity, ChainValidation, Mode, ValidationResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Persistence for the whole chain.
///
/// This lives in `ledger-core` so the storage crate can implement it without a
/// circular dependency.
pub trait ChainStore: Send + Sync {
    /// Stored blocks in index order, empty when nothing was persisted.
    fn load(&self) -> anyhow::Result<Vec<Block>>;
    fn save(&self, blocks: &[Block]) -> anyhow::Result<()>;
}

/// Owner of the ordered block list.
///
/// Appending needs `&mut self` while every validation borrows `&self`, so a
/// validation pass always sees a complete snapshot of the chain.
pub struct Chain {
    settings: ProofOfWorkSettings,
    pow: Arc<dyn ProofOfWorkEngine>,
    signer: Option<Arc<dyn BlockSigner>>,
    store: Option<Arc<dyn ChainStore>>,
    blocks: Vec<Block>,
}

impl Chain {
    /// In-memory, unsigned chain.
    pub fn new(settings: ProofOfWorkSettings, pow: Arc<dyn ProofOfWorkEngine>) -> Result<Self> {
        Self::with_collaborators(settings, pow, None, None)
    }

    /// Loads the stored chain if there is one, otherwise mines a genesis block.
    pub fn with_collaborators(
        settings: ProofOfWorkSettings,
        pow: Arc<dyn ProofOfWorkEngine>,
        signer: Option<Arc<dyn BlockSigner>>,
        store: Option<Arc<dyn ChainStore>>,
    ) -> Result<Self> {
        let blocks = match &store {
            Some(store) => store.load().unwrap_or_else(|e| {
                warn!("failed to load chain, starting empty: {e:#}");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let mut chain = Self {
            settings,
            pow,
            signer,
            store,
            blocks,
        };

        if chain.blocks.is_empty() {
            chain.add_genesis_block()?;
        } else {
            info!(height = chain.blocks.len(), "loaded chain");
        }
        Ok(chain)
    }

    fn add_genesis_block(&mut self) -> Result<()> {
        let genesis = self.seal(Block::genesis(current_timestamp_ms()?))?;
        info!(hash = genesis.hash(), "created genesis block");
        self.blocks.push(genesis);
        self.persist();
        Ok(())
    }

    /// Mine, sign and append a block carrying `data`.
    ///
    /// On failure the chain is left exactly as it was.
    pub fn add_block(&mut self, data: impl Into<String>) -> Result<&Block> {
        let previous_hash = self
            .blocks
            .last()
            .map_or(GENESIS_PREVIOUS_HASH, Block::hash)
            .to_string();
        let candidate = Block::new(
            self.blocks.len() as u64,
            current_timestamp_ms()?,
            previous_hash,
            data,
            self.settings.difficulty,
        );
        let block = self.seal(candidate)?;
        info!(index = block.index(), hash = block.hash(), "appended block");
        let position = self.blocks.len();
        self.blocks.push(block);
        self.persist();
        Ok(&self.blocks[position])
    }

    fn seal(&self, candidate: Block) -> Result<Block> {
        let mined = self.pow.mine(candidate)?;
        match &self.signer {
            Some(signer) => {
                let signature = signer.sign(&mined)?;
                Ok(mined.with_signature(signature))
            }
            None => Ok(mined),
        }
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.blocks) {
                warn!("failed to save chain: {e:#}");
            }
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn settings(&self) -> &ProofOfWorkSettings {
        &self.settings
    }

    /// Linkage, hash and signature of every block, stopping at the first failure.
    pub fn validate_entire_chain(&self) -> ChainValidation<'_> {
        ChainValidation::new(
            &self.blocks,
            Mode::FullChain,
            self.pow.as_ref(),
            self.signer.as_deref(),
        )
    }

    /// Hash and signature of every block without looking at linkage, stopping at
    /// the first failure.
    pub fn validate_blocks_individually(&self) -> ChainValidation<'_> {
        ChainValidation::new(
            &self.blocks,
            Mode::PerBlock,
            self.pow.as_ref(),
            self.signer.as_deref(),
        )
    }

    /// Index sequencing and previous-hash chaining only.
    ///
    /// `None` only for a chain with no blocks at all.
    pub fn validate_chain_integrity(&self) -> Option<ValidationResult<'_>> {
        check_integrity(&self.blocks)
    }
}
