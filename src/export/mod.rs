//! Model persistence
//!
//! A trained model is serialized with bincode inside a small versioned
//! envelope and handed to a [`ModelStore`] as bytes.

mod store;

pub use store::{DirectoryStore, InMemoryStore, ModelStore};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{LensError, Result};

/// Envelope format version; bumped on incompatible model layout changes
pub const FORMAT_VERSION: u32 = 1;

/// Versioned wrapper around a persisted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredModel<M> {
    pub format_version: u32,
    pub crate_version: String,
    /// RFC 3339 creation time
    pub created_at: String,
    pub model: M,
}

impl<M> StoredModel<M> {
    pub fn new(model: M) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            model,
        }
    }
}

/// Serialize a model into envelope bytes
pub fn to_bytes<M: Serialize>(model: &M) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&StoredModel::new(model))?)
}

/// Deserialize envelope bytes, checking the format version
pub fn from_bytes<M: DeserializeOwned>(bytes: &[u8]) -> Result<StoredModel<M>> {
    let stored: StoredModel<M> = bincode::deserialize(bytes)?;
    if stored.format_version != FORMAT_VERSION {
        return Err(LensError::Serialization(format!(
            "unsupported model format version {} (expected {})",
            stored.format_version, FORMAT_VERSION
        )));
    }
    Ok(stored)
}
