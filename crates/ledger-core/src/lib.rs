//! Hash-linked, proof-of-work sealed and signed ledger.
//!
//! A [`Chain`] mines each new [`Block`] through a [`ProofOfWorkEngine`], signs it
//! with a [`BlockSigner`] and appends it. Three read-only validations re-check
//! what was built: [`Chain::validate_entire_chain`],
//! [`Chain::validate_blocks_individually`] and [`Chain::validate_chain_integrity`].

pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod hash;
pub mod pow;
pub mod signer;
pub mod validation;

pub use block::{current_timestamp_ms, Block};
pub use chain::{Chain, ChainStore};
pub use error::{LedgerError, Result};
pub use hash::{BlockHasher, Sha256Hasher};
pub use pow::{ProofOfWork, ProofOfWorkEngine, ProofOfWorkSettings};
pub use signer::{BlockSigner, EcdsaBlockSigner, KeyStore, MemoryKeyStore, SigningKey};
pub use validation::{ChainValidation, ValidationResult, HASH_INVALID, SIGNATURE_INVALID};
