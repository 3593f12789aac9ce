//! Download artifact descriptors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk result of a successful download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    path: PathBuf,
    size: u64,
    digest: String,
}

impl Artifact {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64, digest: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size,
            digest: digest.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total bytes written.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lowercase hex digest of the written bytes.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }
}
