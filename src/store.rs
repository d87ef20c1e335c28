use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::model::RawPayload;

pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Raw pages and attachments on disk, addressed by the SHA-256 of their bytes:
/// `root/ab/cd/ef/abcdef...`. Append-only; a second store of the same bytes is
/// a no-op. Not safe for two concurrent writers of the same hash.
pub struct RawStore {
    root: PathBuf,
}

impl RawStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(RawStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.root
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(&hash[4..6])
            .join(hash)
    }

    /// Returns true if the bytes were written, false if they were already
    /// present. A zero-length file at the target is an interrupted write and
    /// gets overwritten. Bytes go to a temp file in the shard directory first
    /// and are renamed into place, so the target is never partially written.
    pub fn store(&self, content: &[u8]) -> Result<bool, StoreError> {
        let path = self.path_for(&content_hash(content));
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        match fs::metadata(&path) {
            Ok(meta) if meta.len() > 0 => {
                let violation = || StoreError::IntegrityViolation {
                    path: path.clone(),
                    stored_len: meta.len(),
                    new_len: content.len() as u64,
                };
                if meta.len() != content.len() as u64 {
                    return Err(violation());
                }
                if fs::read(&path).map_err(io_err)? != content {
                    return Err(violation());
                }
                return Ok(false);
            }
            Ok(_) => debug!(path = %path.display(), "overwriting zero-length payload file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }

        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(content).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(true)
    }

    /// Store a payload and hand back its hash with the "newly written" flag.
    pub fn store_payload(&self, payload: &RawPayload) -> Result<(String, bool), StoreError> {
        let written = self.store(payload.content())?;
        Ok((payload.hash(), written))
    }
}
