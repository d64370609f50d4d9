use anyhow::{Context, Result};
use ledger_core::{Block, ChainStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CHAIN_FILE_NAME: &str = "blockchain.json";

/// The whole chain as one indented JSON array.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(CHAIN_FILE_NAME);
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChainStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Block>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no chain file yet");
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let blocks: Vec<Block> = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        debug!(count = blocks.len(), path = %self.path.display(), "loaded chain file");
        Ok(blocks)
    }

    fn save(&self, blocks: &[Block]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(blocks)?;
        // Write then rename so a crash never leaves a half-written chain file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!(count = blocks.len(), path = %self.path.display(), "saved chain file");
        Ok(())
    }
}
