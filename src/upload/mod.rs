//! File uploads to the remote drive.

pub mod filename;
mod orchestrator;
mod temp;

pub use orchestrator::{upload_file, UploadState};
pub use temp::TempUpload;

use thiserror::Error;

use crate::drive::DriveError;

/// Upload failures.
#[derive(Error, Debug)]
pub enum UploadError {
    /// No destination folder was given or resolved.
    #[error("no destination folder")]
    MissingDestination,

    /// The request carried no file.
    #[error("no file uploaded")]
    MissingFile,

    #[error("file exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("upload I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Drive(#[from] DriveError),
}

impl UploadError {
    /// Whether the client caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::MissingDestination | UploadError::MissingFile | UploadError::TooLarge { .. }
        )
    }
}
