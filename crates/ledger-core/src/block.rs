use crate::constants::{
    CANONICAL_SEPARATOR, GENESIS_DATA, GENESIS_DIFFICULTY, GENESIS_PREVIOUS_HASH,
};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A sealed ledger record.
///
/// Blocks are values: mining and signing hand back a new `Block` instead of
/// mutating the receiver, and the chain only ever exposes shared references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub(crate) index: u64,
    pub(crate) timestamp: i64,
    pub(crate) previous_hash: String,
    pub(crate) data: String,
    pub(crate) difficulty: u32,
    pub(crate) hash: String,
    pub(crate) nonce: u64,
    #[serde(default)]
    pub(crate) signature: String,
}

impl Block {
    /// An unmined candidate: empty hash and signature, nonce 0.
    pub fn new(
        index: u64,
        timestamp: i64,
        previous_hash: impl Into<String>,
        data: impl Into<String>,
        difficulty: u32,
    ) -> Self {
        Self {
            index,
            timestamp,
            previous_hash: previous_hash.into(),
            data: data.into(),
            difficulty,
            hash: String::new(),
            nonce: 0,
            signature: String::new(),
        }
    }

    /// Unmined genesis candidate stamped with `timestamp`.
    pub fn genesis(timestamp: i64) -> Self {
        Self::new(
            0,
            timestamp,
            GENESIS_PREVIOUS_HASH,
            GENESIS_DATA,
            GENESIS_DIFFICULTY,
        )
    }

    /// Copy of this block sealed with a winning hash/nonce pair.
    pub fn with_mined(self, hash: impl Into<String>, nonce: u64) -> Self {
        Self {
            hash: hash.into(),
            nonce,
            ..self
        }
    }

    /// Copy of this block carrying a detached signature.
    pub fn with_signature(self, signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            ..self
        }
    }

    /// Fields covered by the hash and the signature, in fixed order, with `nonce`
    /// standing in for the stored one. Hash and signature are never part of it.
    pub fn canonical(&self, nonce: u64) -> String {
        let sep = CANONICAL_SEPARATOR;
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.index, self.timestamp, self.previous_hash, self.data, self.difficulty, nonce
        )
    }

    pub fn canonical_bytes(&self, nonce: u64) -> Vec<u8> {
        self.canonical(nonce).into_bytes()
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3}|{}|{}|{}|{:>3}|{:>3}|{}",
            self.index,
            self.timestamp,
            self.previous_hash,
            self.hash,
            self.difficulty,
            self.nonce,
            self.data
        )
    }
}

/// Milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Clock(e.to_string()))?;
    i64::try_from(elapsed.as_millis()).map_err(|e| LedgerError::Clock(e.to_string()))
}
