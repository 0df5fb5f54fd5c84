//! Evidence attachments
//!
//! The core treats evidence as an opaque reference. [`EvidenceVault`] is the
//! media transform used by the CLI: it bounds the attachment size and stores
//! the bytes under their SHA-256 digest, returning a `sha256:<hex>` reference.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default attachment limit (2 MiB)
pub const DEFAULT_MAX_BYTES: usize = 2 * 1024 * 1024;

/// Opaque reference to an evidence blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceRef(String);

impl EvidenceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from storing or fetching evidence
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Evidence is empty")]
    Empty,

    #[error("Evidence is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Evidence reference '{0}' is not managed by this vault")]
    UnknownReference(String),

    #[error("Evidence IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns raw attachment bytes into a bounded evidence reference
pub trait MediaTransform: Send + Sync {
    fn store(&self, raw: &[u8], name_hint: Option<&str>) -> Result<EvidenceRef, MediaError>;
}

/// Content-addressed evidence directory
#[derive(Debug, Clone)]
pub struct EvidenceVault {
    dir: PathBuf,
    max_bytes: usize,
}

impl EvidenceVault {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a stored blob, if the reference belongs to this vault
    pub fn path_for(&self, reference: &EvidenceRef) -> Result<PathBuf, MediaError> {
        let hex = reference
            .as_str()
            .strip_prefix("sha256:")
            .filter(|h| h.len() == 64 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| MediaError::UnknownReference(reference.to_string()))?;
        Ok(self.dir.join(hex))
    }

    /// Read back a stored blob
    pub fn load(&self, reference: &EvidenceRef) -> Result<Vec<u8>, MediaError> {
        let path = self.path_for(reference)?;
        Ok(fs::read(path)?)
    }
}

impl MediaTransform for EvidenceVault {
    fn store(&self, raw: &[u8], name_hint: Option<&str>) -> Result<EvidenceRef, MediaError> {
        if raw.is_empty() {
            return Err(MediaError::Empty);
        }
        if raw.len() > self.max_bytes {
            return Err(MediaError::TooLarge {
                size: raw.len(),
                limit: self.max_bytes,
            });
        }

        let hex = format!("{:x}", Sha256::digest(raw));
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&hex);
        if !path.exists() {
            fs::write(&path, raw)?;
        }
        tracing::debug!(digest = %hex, hint = ?name_hint, bytes = raw.len(), "stored evidence");
        Ok(EvidenceRef::new(format!("sha256:{}", hex)))
    }
}
