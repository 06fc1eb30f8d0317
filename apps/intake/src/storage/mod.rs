//! Session-scoped key-value storage for in-progress wizard documents.
//!
//! Each browser session gets its own [`SessionStore`]; the wizard keeps its
//! document under [`FORM_KEY`] in that store until a submission succeeds.
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Key the wizard document is stored under.
pub const FORM_KEY: &str = "kl_cv_form";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// String-valued key-value store scoped to one browser session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Serializes `value` under `key`. Failures are logged and swallowed.
pub fn save<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|json| store.set(key, json));
    if let Err(e) = result {
        warn!("Failed to persist '{key}' to session store: {e}");
    }
}

/// Reads and deserializes `key`, returning `fallback` when missing or unreadable.
pub fn load_or<T: DeserializeOwned>(store: &dyn SessionStore, key: &str, fallback: T) -> T {
    match store.get(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unreadable '{key}' from session store: {e}");
                fallback
            }
        },
        Ok(None) => fallback,
        Err(e) => {
            warn!("Failed to read '{key}' from session store: {e}");
            fallback
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write-then-rename so readers never see a half-written document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Hands out the per-session store for a session id.
pub enum SessionStores {
    Memory(Mutex<HashMap<Uuid, Arc<MemoryStore>>>),
    Files(PathBuf),
}

impl SessionStores {
    pub fn in_memory() -> Self {
        SessionStores::Memory(Mutex::new(HashMap::new()))
    }

    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        SessionStores::Files(root.into())
    }

    /// Opens (creating if needed) the store for `session`.
    pub fn open(&self, session: Uuid) -> Result<Arc<dyn SessionStore>, StorageError> {
        match self {
            SessionStores::Memory(stores) => {
                let mut stores = stores.lock().map_err(|_| {
                    StorageError::Unavailable("session registry lock poisoned".to_string())
                })?;
                let store: Arc<dyn SessionStore> = stores.entry(session).or_default().clone();
                Ok(store)
            }
            SessionStores::Files(root) => {
                debug!("Opening file session store for {session}");
                Ok(Arc::new(FileStore::new(session_dir(root, session))))
            }
        }
    }

    /// Deletes everything stored for `session`. Unknown sessions are ignored.
    pub fn discard(&self, session: Uuid) -> Result<(), StorageError> {
        match self {
            SessionStores::Memory(stores) => {
                stores
                    .lock()
                    .map_err(|_| {
                        StorageError::Unavailable("session registry lock poisoned".to_string())
                    })?
                    .remove(&session);
                Ok(())
            }
            SessionStores::Files(root) => match fs::remove_dir_all(session_dir(root, session)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Whether `session` has been opened and not discarded.
    pub fn contains(&self, session: Uuid) -> bool {
        match self {
            SessionStores::Memory(stores) => stores
                .lock()
                .map(|stores| stores.contains_key(&session))
                .unwrap_or(false),
            SessionStores::Files(root) => session_dir(root, session).is_dir(),
        }
    }
}

fn session_dir(root: &Path, session: Uuid) -> PathBuf {
    root.join(session.to_string())
}
