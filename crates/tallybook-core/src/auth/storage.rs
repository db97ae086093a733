//! Durable client-side storage for the credential token.
//!
//! A small string-keyed store: `get`, `set`, `remove`. Removing a key that
//! is not there is not an error. Three backends are provided: a JSON file in
//! the cache directory, the OS keychain, and an in-process map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use crate::config::StorageBackend;

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "token";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Keychain service name
const SERVICE_NAME: &str = "tallybook";

pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. A missing key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Open the store selected by `backend`, rooted at `cache_dir` where relevant
pub fn open_store(backend: StorageBackend, cache_dir: &Path) -> Box<dyn TokenStore> {
    debug!(?backend, ?cache_dir, "Opening token store");
    match backend {
        StorageBackend::File => Box::new(FileTokenStore::new(cache_dir.to_path_buf())),
        StorageBackend::Keyring => Box::new(KeyringTokenStore::new(SERVICE_NAME)),
        StorageBackend::Memory => Box::new(MemoryTokenStore::default()),
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        store.lock().insert(key.to_string(), value.to_string());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

/// Key-value entries persisted as pretty JSON in `<cache_dir>/session.json`
pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn read_contents(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        Ok(Some(contents))
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match self.read_contents()? {
            Some(contents) => serde_json::from_str(&contents).context("Failed to parse session file"),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Entries to rewrite. An unparsable file is discarded; the flag reports
    /// whether that happened.
    fn load_for_update(&self) -> Result<(BTreeMap<String, String>, bool)> {
        let Some(contents) = self.read_contents()? else {
            return Ok((BTreeMap::new(), false));
        };
        match serde_json::from_str(&contents) {
            Ok(entries) => Ok((entries, false)),
            Err(e) => {
                warn!(error = %e, path = ?self.session_path(), "Discarding unparsable session file");
                Ok((BTreeMap::new(), true))
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let path = self.session_path();
        if entries.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let (mut entries, _) = self.load_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let (mut entries, discarded) = self.load_for_update()?;
        if entries.remove(key).is_some() || discarded {
            self.save(&entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// OS keychain
// ============================================================================

/// One keychain entry per key, under a fixed service name
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
