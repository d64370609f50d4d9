use anyhow::{Context, Result};
use ledger_core::{Block, ChainStore};
use sled::{Batch, Db, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";

/// Blocks keyed by big-endian chain position so tree order is chain order.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let db = sled::open(path.as_ref())
      .with_context(|| format!("failed to open sled store at {}", path.as_ref().display()))?;
    info!("sled store opened");
    Ok(Self { db })
  }

  fn blocks(&self) -> Result<Tree> {
    self.db.open_tree(TREE_BLOCKS).context("failed to open blocks tree")
  }

  pub fn clear(&self) -> Result<()> {
    self.blocks()?.clear()?;
    self.db.flush()?;
    Ok(())
  }

  pub fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}

impl ChainStore for SledStore {
  fn load(&self) -> Result<Vec<Block>> {
    let tree = self.blocks()?;
    let mut blocks = Vec::with_capacity(tree.len());
    for entry in tree.iter() {
      let (key, value) = entry?;
      let block: Block = bincode::deserialize(&value)
        .with_context(|| format!("corrupt block under key {}", hex::encode(&key)))?;
      blocks.push(block);
    }
    debug!(count = blocks.len(), "loaded blocks from sled");
    Ok(blocks)
  }

  fn save(&self, blocks: &[Block]) -> Result<()> {
    let tree = self.blocks()?;
    let mut batch = Batch::default();
    // keyed by position, not by the block's own index, so a bad index on disk
    // reloads in the same slot
    for (position, block) in blocks.iter().enumerate() {
      batch.insert((position as u64).to_be_bytes().to_vec(), bincode::serialize(block)?);
    }
    // drop anything past the new tip
    for entry in tree.range((blocks.len() as u64).to_be_bytes()..) {
      let (key, _) = entry?;
      batch.remove(key);
    }
    tree.apply_batch(batch)?;
    self.db.flush()?;
    debug!(count = blocks.len(), "saved blocks to sled");
    Ok(())
  }
}
