//! Artifact writer: tees downloaded bytes into a file and a running digest.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::error::GuardError;
use crate::specs::Artifact;

/// Content digest computed while an artifact is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unsupported digest algorithm: {other}")),
        }
    }
}

enum Hasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(Md5::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Md5(h) => h.update(bytes),
            Self::Sha256(h) => h.update(bytes),
        }
    }

    fn hex(&self) -> String {
        match self {
            Self::Md5(h) => hex_encode(&h.clone().finalize()),
            Self::Sha256(h) => hex_encode(&h.clone().finalize()),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// Sink writing every chunk to a file while counting bytes and feeding a
/// digest, so a download never holds the whole body in memory.
pub struct ArtifactWriter {
    file: BufWriter<File>,
    hasher: Hasher,
    path: PathBuf,
    count: u64,
}

impl fmt::Debug for ArtifactWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactWriter")
            .field("path", &self.path)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl ArtifactWriter {
    /// Creates (or truncates) the artifact file.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::FileIo`] if the file cannot be created.
    pub async fn create(
        path: impl Into<PathBuf>,
        algorithm: DigestAlgorithm,
    ) -> Result<Self, GuardError> {
        let path = path.into();
        let file = File::create(&path)
            .await
            .map_err(|e| GuardError::file_io(path.clone(), e))?;
        debug!(path = %path.display(), %algorithm, "artifact file created");
        Ok(Self {
            file: BufWriter::new(file),
            hasher: Hasher::new(algorithm),
            path,
            count: 0,
        })
    }

    /// Appends `chunk` to the file, then counts it, then feeds the digest.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::FileIo`] if the file write fails; nothing is
    /// counted or hashed for that chunk.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), GuardError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| GuardError::file_io(self.path.clone(), e))?;
        self.count += chunk.len() as u64;
        self.hasher.update(chunk);
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Hex digest of the bytes written so far.
    #[must_use]
    pub fn hex_digest(&self) -> String {
        self.hasher.hex()
    }

    /// Flushes and releases the file handle, returning the artifact descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::FileIo`] if buffered bytes cannot be flushed.
    pub async fn close(mut self) -> Result<Artifact, GuardError> {
        self.file
            .flush()
            .await
            .map_err(|e| GuardError::file_io(self.path.clone(), e))?;
        self.file
            .shutdown()
            .await
            .map_err(|e| GuardError::file_io(self.path.clone(), e))?;
        Ok(Artifact::new(self.path, self.count, self.hasher.hex()))
    }

    /// Closes the handle and removes the partial file.
    pub(crate) async fn discard(self) {
        let path = self.path;
        drop(self.file);
        debug!(path = %path.display(), "removing partial artifact");
        if let Err(error) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), %error, "failed to remove partial artifact");
        }
    }
}
