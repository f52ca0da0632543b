//! Local spool files for uploads in flight.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::UploadError;
use crate::drive::ByteStream;

/// Temporary file holding one uploaded file.
///
/// The file is deleted by [`TempUpload::remove`], or on drop if that never ran.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    file: Option<File>,
    size: u64,
    max_bytes: u64,
    removed: bool,
}

impl TempUpload {
    /// Create an empty spool file in `dir`.
    pub async fn create(dir: impl AsRef<Path>, max_bytes: u64) -> Result<Self, UploadError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}.part", uuid::Uuid::new_v4()));
        let file = File::create(&path).await?;

        Ok(Self {
            path,
            file: Some(file),
            size: 0,
            max_bytes,
            removed: false,
        })
    }

    /// Append a chunk. Fails once the total exceeds the size limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        self.size += chunk.len() as u64;
        if self.size > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        match self.file.as_mut() {
            Some(file) => Ok(file.write_all(chunk).await?),
            None => Err(UploadError::Io(std::io::Error::other(
                "spool file already finished",
            ))),
        }
    }

    /// Flush and close the spool file for writing.
    pub async fn finish(&mut self) -> Result<(), UploadError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stream the spooled content.
    pub async fn open_stream(&self) -> Result<ByteStream, UploadError> {
        let file = File::open(&self.path).await?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    /// Delete the spool file.
    pub async fn remove(mut self) -> std::io::Result<()> {
        self.file.take();
        self.removed = true;
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove spool file");
            }
        }
    }
}
