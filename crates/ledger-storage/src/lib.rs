//! Disk-backed collaborators for `ledger-core`: chain stores and the signing key store.

pub mod json_store;
pub mod key_store;
pub mod sled_store;

pub use json_store::JsonFileStore;
pub use key_store::FileKeyStore;
pub use sled_store::SledStore;
