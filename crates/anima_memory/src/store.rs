//! Whole-document storage for the persona state files.
//!
//! Documents are addressed by a relative path under a store root and are
//! always read and written in full. A missing document is `Ok(None)`, not an
//! error.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid document path: {0}")]
    InvalidPath(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Codec {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a whole document. `Ok(None)` when it does not exist.
    async fn read(&self, path: &str) -> StoreResult<Option<String>>;

    /// Replace a whole document, creating parent directories as needed.
    async fn write(&self, path: &str, contents: &str) -> StoreResult<()>;
}

/// Read and decode a JSON document.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &str,
) -> StoreResult<Option<T>> {
    match store.read(path).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Codec {
                path: path.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write a JSON document (pretty-printed, trailing newline).
pub async fn save_json<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    path: &str,
    value: &T,
) -> StoreResult<()> {
    let mut raw = serde_json::to_string_pretty(value).map_err(|source| StoreError::Codec {
        path: path.to_string(),
        source,
    })?;
    raw.push('\n');
    store.write(path, &raw).await
}

// ============================================================================
// Filesystem
// ============================================================================

/// Store rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root, refusing anything that could escape it.
    pub fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let rel = Path::new(path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.trim().is_empty() || escapes {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn read(&self, path: &str) -> StoreResult<Option<String>> {
        let full = self.resolve(path)?;
        match tokio::fs::read_to_string(&full).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: full.display().to_string(),
                source,
            }),
        }
    }

    async fn write(&self, path: &str, contents: &str) -> StoreResult<()> {
        let full = self.resolve(path)?;
        let io_err = |source| StoreError::Io {
            path: full.display().to_string(),
            source,
        };
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        // Write beside the target and rename so readers never see half a file.
        // Each write gets its own temp name so concurrent writers never share one.
        let name = full
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let tmp = full.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &full).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        tracing::debug!("Wrote {} ({} bytes)", full.display(), contents.len());
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Map-backed store for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: &str, contents: impl Into<String>) {
        self.docs.write().await.insert(path.to_string(), contents.into());
    }

    pub async fn get(&self, path: &str) -> Option<String> {
        self.docs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> StoreResult<Option<String>> {
        Ok(self.get(path).await)
    }

    async fn write(&self, path: &str, contents: &str) -> StoreResult<()> {
        self.insert(path, contents).await;
        Ok(())
    }
}
