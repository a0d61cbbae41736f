//! Byte stores for persisted models

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LensError, Result};

/// Storage backend addressed by opaque identifiers
pub trait ModelStore: Send + Sync {
    /// Store `bytes` under `id`, replacing any previous entry
    fn save(&self, id: &str, bytes: &[u8]) -> Result<()>;

    /// Load the bytes stored under `id`; `ModelNotFound` if absent
    fn load(&self, id: &str) -> Result<Vec<u8>>;

    fn contains(&self, id: &str) -> bool;

    /// Identifiers currently stored, sorted
    fn ids(&self) -> Result<Vec<String>>;
}

/// Process-local store, shareable across threads
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ModelStore for InMemoryStore {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<()> {
        self.entries.write().insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LensError::ModelNotFound(id.to_string()))
    }

    fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    fn ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// One `{id}.bin` file per model under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    const EXTENSION: &'static str = "bin";

    /// Create or open a store at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(format!("{}.{}", id, Self::EXTENSION)))
    }
}

impl ModelStore for DirectoryStore {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(id)?;
        let mut file = File::create(&path)?;
        file.write_all(bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote model file");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<u8>> {
        // an id `save` would reject cannot have been stored
        let path = self
            .path_for(id)
            .map_err(|_| LensError::ModelNotFound(id.to_string()))?;
        if !path.is_file() {
            return Err(LensError::ModelNotFound(id.to_string()));
        }
        let mut bytes = Vec::new();
        File::open(&path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn contains(&self, id: &str) -> bool {
        self.path_for(id).map(|p| p.is_file()).unwrap_or(false)
    }

    fn ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Identifiers become file names: non-empty, ASCII alphanumerics plus
/// `-`, `_` and `.`, no leading dot
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(LensError::InvalidParameter {
            name: "id".to_string(),
            value: id.to_string(),
            reason: "must be ASCII alphanumerics, '-', '_' or '.', without a leading dot".to_string(),
        })
    }
}
