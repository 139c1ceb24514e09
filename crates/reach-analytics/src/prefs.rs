//! Operator preference store
//!
//! A small scope → campaign-id-list store backing the dashboard's saved
//! campaign selection. Reads come from an in-memory map; writes go through
//! to a JSON file so selections survive restarts. Purely presentation-layer
//! state; nothing in the aggregation core reads it.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("Failed to read preferences: {0}")]
    ReadError(String),

    #[error("Failed to parse preferences: {0}")]
    ParseError(String),

    #[error("Failed to write preferences: {0}")]
    WriteError(String),
}

/// Opaque key-value preference store consumed by the presentation layer.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, scope: &str) -> Vec<String>;
    fn set(&self, scope: &str, ids: Vec<String>) -> Result<(), PrefsError>;
}

/// JSON-file backed store with an in-memory mirror.
pub struct FilePreferenceStore {
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl FilePreferenceStore {
    /// Load from `path`; a missing file starts empty, a corrupt one is
    /// replaced on the next write.
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "unreadable preference file, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path: Some(path),
            entries: RwLock::new(entries),
        }
    }

    /// Volatile store for tests and ephemeral deployments.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn persist(&self, entries: &HashMap<String, Vec<String>>) -> Result<(), PrefsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| PrefsError::WriteError(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PrefsError::WriteError(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| PrefsError::WriteError(e.to_string()))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, scope: &str) -> Vec<String> {
        self.entries.read().get(scope).cloned().unwrap_or_default()
    }

    fn set(&self, scope: &str, ids: Vec<String>) -> Result<(), PrefsError> {
        let mut entries = self.entries.write();
        entries.insert(scope.to_string(), ids);
        self.persist(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let store = FilePreferenceStore::in_memory();
        assert!(store.get("admin").is_empty());

        store
            .set("admin", vec!["c1".to_string(), "c2".to_string()])
            .unwrap();
        assert_eq!(store.get("admin"), vec!["c1", "c2"]);

        store.set("admin", vec!["c3".to_string()]).unwrap();
        assert_eq!(store.get("admin"), vec!["c3"]);
        assert!(store.get("other").is_empty());
    }

    #[test]
    fn file_round_trip_survives_reload() {
        let dir = std::env::temp_dir().join("openreach-prefs-test");
        let path = dir.join("prefs.json");
        let _ = std::fs::remove_file(&path);

        let store = FilePreferenceStore::load(path.clone());
        store.set("admin", vec!["c9".to_string()]).unwrap();
        drop(store);

        let reloaded = FilePreferenceStore::load(path);
        assert_eq!(reloaded.get("admin"), vec!["c9"]);
    }
}
