//! Detached block signatures.
//!
//! Blocks are signed with ECDSA P-256 over SHA-256 of their canonical encoding
//! (stored nonce included). Signatures travel as standard base64 text.

use crate::block::Block;
use crate::error::{LedgerError, Result};
use data_encoding::BASE64;
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A P-256 key pair together with the PKCS#8 document it was built from.
pub struct SigningKey {
    pkcs8: Vec<u8>,
    key_pair: EcdsaKeyPair,
}

impl SigningKey {
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let document = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|e| LedgerError::KeyStore(format!("failed to generate key pair: {e}")))?;
        Self::from_pkcs8(document.as_ref())
    }

    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Self> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
            .map_err(|e| LedgerError::KeyStore(format!("invalid PKCS#8 key: {e}")))?;
        Ok(Self {
            pkcs8: pkcs8.to_vec(),
            key_pair,
        })
    }

    pub fn pkcs8(&self) -> &[u8] {
        &self.pkcs8
    }

    /// Uncompressed SEC1 public point.
    pub fn public_key(&self) -> &[u8] {
        self.key_pair.public_key().as_ref()
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let signature = self
            .key_pair
            .sign(&rng, message)
            .map_err(|e| LedgerError::Signing(format!("failed to sign message: {e}")))?;
        Ok(signature.as_ref().to_vec())
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, self.public_key())
            .verify(message, signature)
            .is_ok()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

/// Source of the signing key. Repeat calls within a process hand back the same key.
pub trait KeyStore: Send + Sync {
    fn load_or_generate_key(&self) -> Result<Arc<SigningKey>>;

    fn public_key(&self) -> Result<Vec<u8>> {
        Ok(self.load_or_generate_key()?.public_key().to_vec())
    }
}

/// Key store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<Arc<SigningKey>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: SigningKey) -> Self {
        Self {
            key: Mutex::new(Some(Arc::new(key))),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_or_generate_key(&self) -> Result<Arc<SigningKey>> {
        let mut slot = self
            .key
            .lock()
            .map_err(|_| LedgerError::KeyStore("key slot poisoned".to_string()))?;
        if let Some(key) = slot.as_ref() {
            return Ok(Arc::clone(key));
        }
        let key = Arc::new(SigningKey::generate()?);
        info!("generated in-memory signing key");
        *slot = Some(Arc::clone(&key));
        Ok(key)
    }
}

pub trait BlockSigner: Send + Sync {
    /// Base64 signature over the block's canonical encoding.
    fn sign(&self, block: &Block) -> Result<String>;

    /// False on any mismatch or undecodable signature text; never an error.
    fn verify(&self, block: &Block) -> bool;
}

pub struct EcdsaBlockSigner {
    keys: Arc<dyn KeyStore>,
}

impl EcdsaBlockSigner {
    pub fn new(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }
}

impl BlockSigner for EcdsaBlockSigner {
    fn sign(&self, block: &Block) -> Result<String> {
        let key = self.keys.load_or_generate_key()?;
        let signature = key.sign(&block.canonical_bytes(block.nonce()))?;
        Ok(BASE64.encode(&signature))
    }

    fn verify(&self, block: &Block) -> bool {
        let key = match self.keys.load_or_generate_key() {
            Ok(key) => key,
            Err(e) => {
                debug!(index = block.index(), "no key to verify against: {e}");
                return false;
            }
        };
        let signature = match BASE64.decode(block.signature().as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(index = block.index(), "undecodable signature: {e}");
                return false;
            }
        };
        key.verify(&block.canonical_bytes(block.nonce()), &signature)
    }
}
