use ledger_core::{KeyStore, LedgerError, Result, SigningKey};
use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub const KEY_FILE_NAME: &str = "block_signing_key.pk8";

/// Signing key persisted as a PKCS#8 document.
///
/// The key is read (or generated and written) on first use and cached for the
/// lifetime of the store. A file that cannot be parsed is replaced by a fresh key.
pub struct FileKeyStore {
    dir: PathBuf,
    path: PathBuf,
    key: Mutex<Option<Arc<SigningKey>>>,
}

impl FileKeyStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(KEY_FILE_NAME);
        Self {
            dir,
            path,
            key: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_key(&self) -> Option<SigningKey> {
        if !self.path.exists() {
            return None;
        }
        let loaded = fs::read(&self.path)
            .map_err(|e| LedgerError::KeyStore(e.to_string()))
            .and_then(|bytes| SigningKey::from_pkcs8(&bytes));
        match loaded {
            Ok(key) => {
                info!(path = %self.path.display(), "loaded signing key");
                Some(key)
            }
            Err(e) => {
                warn!(path = %self.path.display(), "discarding unreadable signing key: {e}");
                None
            }
        }
    }

    fn generate_and_save(&self) -> Result<SigningKey> {
        let key = SigningKey::generate()?;
        self.write_private(key.pkcs8()).map_err(|e| {
            LedgerError::KeyStore(format!("failed to write {}: {e}", self.path.display()))
        })?;
        info!(path = %self.path.display(), "generated signing key");
        Ok(key)
    }
}

impl FileKeyStore {
    /// Writes the key file readable by its owner only.
    fn write_private(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path)?;
        // mode() only applies on creation; tighten a file that was already there
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(bytes)?;
        file.sync_all()
    }
}

impl KeyStore for FileKeyStore {
    fn load_or_generate_key(&self) -> Result<Arc<SigningKey>> {
        let mut slot = self
            .key
            .lock()
            .map_err(|_| LedgerError::KeyStore("key slot poisoned".to_string()))?;
        if let Some(key) = slot.as_ref() {
            return Ok(Arc::clone(key));
        }

        fs::create_dir_all(&self.dir).map_err(|e| {
            LedgerError::KeyStore(format!("failed to create {}: {e}", self.dir.display()))
        })?;
        let key = match self.read_key() {
            Some(key) => key,
            None => self.generate_and_save()?,
        };
        let key = Arc::new(key);
        *slot = Some(Arc::clone(&key));
        Ok(key)
    }
}
