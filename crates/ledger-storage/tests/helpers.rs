#![allow(dead_code)]

use std::fs;
use std::sync::Arc;

use ledger_core::{
    Chain, ChainStore, EcdsaBlockSigner, ProofOfWork, ProofOfWorkSettings,
};
use ledger_storage::{sled_store::SledStore, FileKeyStore};
use rand::{distributions::Alphanumeric, Rng};
use tempfile::{tempdir, TempDir};

pub fn create_temp_dir() -> (TempDir, std::path::PathBuf) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("sled");
    (
        temp_dir,
        SledStore::open(db_path).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let path = temp_dir.path().to_path_buf();
    store.clear().expect("Failed to clear the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&path);
    assert!(!path.exists(), "Temp directory should be removed");
}

pub fn settings() -> ProofOfWorkSettings {
    ProofOfWorkSettings {
        difficulty: 1,
        ..ProofOfWorkSettings::default()
    }
}

/// A signed chain whose key lives in `key_dir` and whose blocks live in `store`.
pub fn open_chain(key_dir: &std::path::Path, store: Arc<dyn ChainStore>) -> Chain {
    let settings = settings();
    let pow = Arc::new(ProofOfWork::new(settings));
    let signer = Arc::new(EcdsaBlockSigner::new(Arc::new(FileKeyStore::new(key_dir))));
    Chain::with_collaborators(settings, pow, Some(signer), Some(store)).expect("open chain")
}

pub fn random_payload(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
