//! Local filesystem blob storage for uploaded videos.
//!
//! Blobs are addressed by opaque keys generated at upload time. A blob is
//! written to `<key>.part` first and renamed into place once the stream
//! ends, so a partially written upload is never served.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, Take};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Upload exceeds the maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },

    /// The incoming byte stream failed mid-upload.
    #[error("{0}")]
    Upload(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

/// Keys are flat file names: ASCII alphanumerics, `-`, `_` and `.`, with
/// no leading dot.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key.len() <= 255
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn not_found(key: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        StorageError::Io(err)
    }
}

impl LocalBlobStore {
    /// Create the store, making `root` if it does not exist.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Write `stream` under `key`, failing once more than `max_bytes`
    /// arrive. Returns the number of bytes stored.
    pub async fn store_stream<S, E>(
        &self,
        key: &str,
        mut stream: S,
        max_bytes: u64,
    ) -> Result<u64, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let path = self.path_for(key)?;
        let part = self.root.join(format!("{key}.part"));

        let result = async {
            let mut file = File::create(&part).await?;
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| StorageError::Upload(e.to_string()))?;
                written += chunk.len() as u64;
                if written > max_bytes {
                    return Err(StorageError::TooLarge { max_bytes });
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, StorageError>(written)
        }
        .await;

        match result {
            Ok(written) => {
                tokio::fs::rename(&part, &path).await?;
                tracing::debug!(key, bytes = written, "Blob stored");
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    /// Size of the blob in bytes.
    pub async fn size(&self, key: &str) -> Result<u64, StorageError> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found(key, e))?;
        Ok(meta.len())
    }

    /// Open the whole blob for reading.
    pub async fn open(&self, key: &str) -> Result<File, StorageError> {
        let path = self.path_for(key)?;
        File::open(&path).await.map_err(|e| not_found(key, e))
    }

    /// Open `length` bytes of the blob starting at `start`.
    pub async fn open_range(
        &self,
        key: &str,
        start: u64,
        length: u64,
    ) -> Result<Take<File>, StorageError> {
        let mut file = self.open(key).await?;
        file.seek(SeekFrom::Start(start)).await?;
        Ok(file.take(length))
    }

    /// Remove the blob. Returns `false` if it did not exist.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
