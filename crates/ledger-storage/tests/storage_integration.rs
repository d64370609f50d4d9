mod helpers;

use helpers::{create_temp_dir, create_temp_store, open_chain, random_payload, teardown_store};
use ledger_core::{
    Block, BlockSigner, ChainStore, EcdsaBlockSigner, KeyStore, MemoryKeyStore, HASH_INVALID,
    SIGNATURE_INVALID,
};
use ledger_storage::json_store::CHAIN_FILE_NAME;
use ledger_storage::key_store::KEY_FILE_NAME;
use ledger_storage::{FileKeyStore, JsonFileStore, SledStore};
use std::fs;
use std::sync::Arc;

#[test]
fn test_json_store_missing_file_loads_empty() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let store = JsonFileStore::new(path.join("not-yet-created"));
    assert!(store.load()?.is_empty());
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_json_store_round_trips_every_field() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let store = Arc::new(JsonFileStore::new(&path));
    let mut chain = open_chain(&path, store.clone());
    for _ in 0..5 {
        chain.add_block(random_payload(32))?;
    }

    let loaded = store.load()?;
    assert_eq!(loaded.as_slice(), chain.blocks());
    assert!(path.join(CHAIN_FILE_NAME).exists());
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_chain_survives_reopen_with_same_key() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let blocks = {
        let mut chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
        chain.add_block("first")?;
        chain.add_block("second")?;
        chain.blocks().to_vec()
    };

    let mut chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
    assert_eq!(chain.blocks(), blocks.as_slice());
    assert!(chain.validate_entire_chain().all(|r| r.is_valid));

    chain.add_block("third")?;
    assert_eq!(chain.len(), 4);
    assert_eq!(chain.blocks()[3].previous_hash(), blocks[2].hash());
    assert_eq!(chain.validate_entire_chain().count(), 4);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_corrupt_chain_file_falls_back_to_fresh_chain() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    fs::write(path.join(CHAIN_FILE_NAME), "{ this is not json")?;
    let store = Arc::new(JsonFileStore::new(&path));
    assert!(store.load().is_err());

    let chain = open_chain(&path, store.clone());
    assert_eq!(chain.len(), 1);
    assert!(chain.last_block().expect("genesis").is_genesis());
    // The fresh genesis replaced the corrupt file.
    assert_eq!(store.load()?.len(), 1);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_tampered_payload_on_disk_is_detected() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    {
        let mut chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
        chain.add_block("alice pays bob 5")?;
        chain.add_block("bob pays carol 2")?;
    }

    let file = path.join(CHAIN_FILE_NAME);
    let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    json[1]["data"] = serde_json::Value::from("alice pays bob 500");
    fs::write(&file, serde_json::to_string_pretty(&json)?)?;

    let chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
    let results: Vec<_> = chain.validate_entire_chain().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_valid);
    assert!(!results[1].is_valid);
    assert_eq!(results[1].block.index(), 1);
    assert_eq!(results[1].message.as_deref(), Some(HASH_INVALID));
    assert!(chain.validate_chain_integrity().expect("non-empty").is_valid);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_foreign_signature_on_disk_is_detected() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    {
        let mut chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
        chain.add_block("signed by the local key")?;
    }

    // Re-sign block 1 with another key; hash and linkage stay intact.
    let stored = JsonFileStore::new(&path).load()?;
    let foreign = EcdsaBlockSigner::new(Arc::new(MemoryKeyStore::new()));
    let forged = foreign.sign(&stored[1])?;

    let file = path.join(CHAIN_FILE_NAME);
    let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    json[1]["signature"] = serde_json::Value::from(forged);
    fs::write(&file, serde_json::to_string_pretty(&json)?)?;

    let chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
    let results: Vec<_> = chain.validate_blocks_individually().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_valid);
    assert_eq!(results[1].message.as_deref(), Some(SIGNATURE_INVALID));
    assert!(chain.validate_chain_integrity().expect("non-empty").is_valid);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_reordered_blocks_fail_linkage_but_not_individual_checks() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    {
        let mut chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
        chain.add_block("one")?;
        chain.add_block("two")?;
    }

    let file = path.join(CHAIN_FILE_NAME);
    let mut json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    if let Some(array) = json.as_array_mut() {
        array.swap(1, 2);
    }
    fs::write(&file, serde_json::to_string_pretty(&json)?)?;

    let chain = open_chain(&path, Arc::new(JsonFileStore::new(&path)));
    assert!(chain.validate_blocks_individually().all(|r| r.is_valid));

    let integrity = chain.validate_chain_integrity().expect("non-empty");
    assert!(!integrity.is_valid);
    assert_eq!(integrity.block.index(), 2);
    assert_eq!(
        integrity.message.as_deref(),
        Some("index mismatch: expected 1, found 2")
    );

    let last = chain.validate_entire_chain().last().expect("at least one result");
    assert!(!last.is_valid);
    assert_eq!(last.block.index(), 2);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_sled_store_round_trip() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let mut chain = open_chain(temp_dir.path(), store.clone());
    for i in 0..10 {
        chain.add_block(format!("block {i}: {}", random_payload(16)))?;
    }

    let loaded = store.load()?;
    assert_eq!(loaded.len(), 11);
    assert_eq!(loaded.as_slice(), chain.blocks());

    drop(chain);
    let store = Arc::try_unwrap(store).ok().expect("single owner");
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_sled_store_persistence() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let db_path = path.join("sled");
    let blocks = {
        let store = Arc::new(SledStore::open(&db_path)?);
        let mut chain = open_chain(&path, store.clone());
        chain.add_block("persist me")?;
        store.close()?;
        chain.blocks().to_vec()
    };

    let store = Arc::new(SledStore::open(&db_path)?);
    let chain = open_chain(&path, store);
    assert_eq!(chain.blocks(), blocks.as_slice());
    assert!(chain.validate_entire_chain().all(|r| r.is_valid));
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_sled_store_save_drops_stale_tail() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let mut chain = open_chain(temp_dir.path(), store.clone());
    chain.add_block("a")?;
    chain.add_block("b")?;

    store.save(&chain.blocks()[..1])?;
    let loaded = store.load()?;
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].is_genesis());

    drop(chain);
    let store = Arc::try_unwrap(store).ok().expect("single owner");
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_sled_store_keeps_block_with_wrong_index_in_place() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    let store = Arc::new(store);
    let mut chain = open_chain(temp_dir.path(), store.clone());
    chain.add_block("a")?;
    chain.add_block("b")?;

    let mut blocks = chain.blocks().to_vec();
    let original = &blocks[1];
    let renumbered = Block::new(
        5,
        original.timestamp(),
        original.previous_hash(),
        original.data(),
        original.difficulty(),
    )
    .with_mined(original.hash(), original.nonce())
    .with_signature(original.signature());
    blocks[1] = renumbered;
    store.save(&blocks)?;

    let loaded = store.load()?;
    let indexes: Vec<u64> = loaded.iter().map(Block::index).collect();
    assert_eq!(indexes, vec![0, 5, 2]);
    assert_eq!(loaded, blocks);

    drop(chain);
    let chain = open_chain(temp_dir.path(), store.clone());
    assert_eq!(chain.blocks(), blocks.as_slice());
    let integrity = chain.validate_chain_integrity().expect("non-empty");
    assert!(!integrity.is_valid);
    assert_eq!(
        integrity.message.as_deref(),
        Some("index mismatch: expected 1, found 5")
    );

    drop(chain);
    let store = Arc::try_unwrap(store).ok().expect("single owner");
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_sled_store_empty_database() -> anyhow::Result<()> {
    let (temp_dir, store) = create_temp_store();
    assert!(store.load()?.is_empty());
    teardown_store(temp_dir, store);
    Ok(())
}

#[test]
fn test_sled_store_corrupt_entry_is_an_error() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let db_path = path.join("sled");
    {
        let db = sled::open(&db_path)?;
        let blocks = db.open_tree("blocks")?;
        blocks.insert(0u64.to_be_bytes(), vec![0xffu8; 3])?;
        db.flush()?;
    }

    let store = SledStore::open(&db_path)?;
    assert!(store.load().is_err());
    drop(store);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_key_store_is_idempotent_and_persistent() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let keys = FileKeyStore::new(&path);
    let first = keys.load_or_generate_key()?;
    let second = keys.load_or_generate_key()?;
    assert!(Arc::ptr_eq(&first, &second));
    assert!(path.join(KEY_FILE_NAME).exists());

    let reopened = FileKeyStore::new(&path);
    assert_eq!(reopened.public_key()?, keys.public_key()?);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_key_store_replaces_unreadable_key() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    fs::write(path.join(KEY_FILE_NAME), b"definitely not pkcs8")?;

    let keys = FileKeyStore::new(&path);
    let key = keys.load_or_generate_key()?;
    assert_eq!(fs::read(path.join(KEY_FILE_NAME))?, key.pkcs8());
    temp_dir.close()?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_key_store_writes_owner_only_file() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let (temp_dir, path) = create_temp_dir();
    FileKeyStore::new(&path).load_or_generate_key()?;
    let mode = fs::metadata(path.join(KEY_FILE_NAME))?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    // A world-readable leftover is tightened when it gets replaced.
    let stale = path.join("stale");
    fs::create_dir_all(&stale)?;
    fs::write(stale.join(KEY_FILE_NAME), b"junk")?;
    fs::set_permissions(stale.join(KEY_FILE_NAME), fs::Permissions::from_mode(0o644))?;
    FileKeyStore::new(&stale).load_or_generate_key()?;
    let mode = fs::metadata(stale.join(KEY_FILE_NAME))?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    temp_dir.close()?;
    Ok(())
}

#[test]
fn test_key_store_creates_missing_directory() -> anyhow::Result<()> {
    let (temp_dir, path) = create_temp_dir();
    let nested = path.join("a").join("b");
    let keys = FileKeyStore::new(&nested);
    keys.load_or_generate_key()?;
    assert!(nested.join(KEY_FILE_NAME).exists());
    temp_dir.close()?;
    Ok(())
}
