//! Persistent session identifier.
//!
//! The backend keys its conversation memory on an opaque identifier that is
//! created once per installation and reused forever after. It lives in a
//! small JSON key-value file so other widget state can share the store.

use crate::error::{Result, WidgetError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Key under which the session identifier is stored.
pub const SESSION_ID_KEY: &str = "chatSessionId";

/// A durable string key-value store backed by one JSON file.
#[derive(Debug)]
pub struct KeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl KeyValueStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt file is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), "session store is corrupt, starting empty: {e}");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), "session store unreadable, starting empty: {e}");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set `key` and flush the whole store to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        // Write-then-rename so a crash never leaves a half-written store.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Return the stored session identifier, creating and persisting a new
/// UUID v4 if none exists.
///
/// # Errors
///
/// Returns an error only when a newly created identifier cannot be persisted.
pub fn load_or_create_session_id(store: &mut KeyValueStore) -> Result<String> {
    if let Some(existing) = store.get(SESSION_ID_KEY).filter(|id| !id.trim().is_empty()) {
        return Ok(existing.to_owned());
    }
    let id = uuid::Uuid::new_v4().to_string();
    store.set(SESSION_ID_KEY, &id).map_err(|e| {
        WidgetError::Session(format!(
            "failed to persist session id to {}: {e}",
            store.path().display()
        ))
    })?;
    info!(session_id = %id, "created new chat session id");
    Ok(id)
}
