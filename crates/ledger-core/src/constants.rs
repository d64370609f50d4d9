pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Joins the fields of the canonical encoding.
pub const CANONICAL_SEPARATOR: char = '|';

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_DATA: &str = "Genesis Block";
pub const GENESIS_DIFFICULTY: u32 = 0;

pub const DEFAULT_DIFFICULTY: u32 = 1;
pub const DEFAULT_MAX_NONCE_ATTEMPTS: u64 = 1_000_000;
pub const DEFAULT_RETARGET_INTERVAL: u32 = 10;
pub const DEFAULT_TARGET_BLOCK_TIME_MS: u64 = 10_000;
