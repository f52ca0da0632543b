//! Moves a spooled upload into a drive folder.

use std::fmt;

use super::{filename, TempUpload, UploadError};
use crate::drive::{CreateFileRequest, DriveApi, RemoteNode};

/// Lifecycle of one upload.
///
/// `Received -> Validated -> Streaming -> Committed`, with `Failed` reachable
/// from every non-terminal state. Both terminal states delete the spool file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Received,
    Validated,
    Streaming,
    Committed,
    Failed,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Committed | UploadState::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Validated, Streaming)
                | (Streaming, Committed)
                | (Received | Validated | Streaming, Failed)
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadState::Received => "received",
            UploadState::Validated => "validated",
            UploadState::Streaming => "streaming",
            UploadState::Committed => "committed",
            UploadState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-upload state tracker that logs transitions.
struct Tracker {
    upload_id: String,
    state: UploadState,
}

impl Tracker {
    fn new(upload_id: String) -> Self {
        tracing::debug!(upload = %upload_id, state = %UploadState::Received, "Upload state");
        Self {
            upload_id,
            state: UploadState::Received,
        }
    }

    fn advance(&mut self, next: UploadState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal upload transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(upload = %self.upload_id, from = %self.state, to = %next, "Upload state");
        self.state = next;
    }
}

/// Upload a spooled file into `destination_folder_id`.
///
/// The name is repaired with [`filename::normalize`]. Without an explicit
/// MIME type one is guessed from the name. The spool file is deleted whether
/// or not the drive accepted the upload.
pub async fn upload_file(
    drive: &dyn DriveApi,
    temp: TempUpload,
    original_filename: &str,
    destination_folder_id: &str,
    mime_type: Option<&str>,
) -> Result<RemoteNode, UploadError> {
    let upload_id = temp
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut tracker = Tracker::new(upload_id);

    let result = send(
        drive,
        &temp,
        original_filename,
        destination_folder_id,
        mime_type,
        &mut tracker,
    )
    .await;

    if let Err(e) = temp.remove().await {
        tracing::warn!(upload = %tracker.upload_id, error = %e, "Failed to remove spool file");
    }

    match &result {
        Ok(node) => {
            tracker.advance(UploadState::Committed);
            tracing::info!(file_id = %node.id, name = %node.name, folder_id = destination_folder_id, "File uploaded");
        }
        Err(e) => {
            tracker.advance(UploadState::Failed);
            tracing::warn!(upload = %tracker.upload_id, error = %e, "Upload failed");
        }
    }

    result
}

async fn send(
    drive: &dyn DriveApi,
    temp: &TempUpload,
    original_filename: &str,
    destination_folder_id: &str,
    mime_type: Option<&str>,
    tracker: &mut Tracker,
) -> Result<RemoteNode, UploadError> {
    let destination = destination_folder_id.trim();
    if destination.is_empty() {
        return Err(UploadError::MissingDestination);
    }

    let name = filename::normalize(original_filename);
    let mime_type = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty() && *m != "application/octet-stream")
        .map(str::to_string)
        .unwrap_or_else(|| mime_guess::from_path(&name).first_or_octet_stream().to_string());
    tracker.advance(UploadState::Validated);

    let content = temp.open_stream().await?;
    tracker.advance(UploadState::Streaming);

    let request = CreateFileRequest {
        name,
        parent_id: destination.to_string(),
        mime_type,
    };
    Ok(drive.create_file(request, content).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::MemoryDrive;
    use std::path::Path;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    async fn spooled(dir: &Path, data: &[u8]) -> TempUpload {
        let mut temp = TempUpload::create(dir, 1024).await.unwrap();
        temp.write_chunk(data).await.unwrap();
        temp.finish().await.unwrap();
        temp
    }

    #[tokio::test]
    async fn test_upload_success_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let drive = MemoryDrive::new();
        drive.insert_folder("inbox", "Inbox", None);

        let temp = spooled(dir.path(), b"my essay").await;
        let node = upload_file(&drive, temp, "essay.txt", "inbox", None)
            .await
            .unwrap();

        assert_eq!(node.name, "essay.txt");
        assert_eq!(node.mime_type, "text/plain");
        assert_eq!(node.parents, vec!["inbox"]);
        assert_eq!(drive.content(&node.id).unwrap(), b"my essay");
        assert_eq!(drive.create_call_count(), 1);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_drive_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let drive = MemoryDrive::new();
        drive.insert_folder("inbox", "Inbox", None);
        drive.set_fail_creates(true);

        let temp = spooled(dir.path(), b"data").await;
        let result = upload_file(&drive, temp, "essay.txt", "inbox", None).await;

        assert!(matches!(result, Err(UploadError::Drive(_))));
        assert_eq!(drive.create_call_count(), 1);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_destination_is_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let drive = MemoryDrive::new();

        let temp = spooled(dir.path(), b"data").await;
        let result = upload_file(&drive, temp, "essay.txt", "  ", None).await;

        let err = result.unwrap_err();
        assert!(matches!(err, UploadError::MissingDestination));
        assert!(err.is_client_error());
        assert_eq!(drive.create_call_count(), 0);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_legacy_filename_repaired() {
        let dir = tempfile::tempdir().unwrap();
        let drive = MemoryDrive::new();
        drive.insert_folder("materials", "Materials", None);

        let mangled: String = "Лекция 1.pdf".bytes().map(|b| b as char).collect();
        let temp = spooled(dir.path(), b"%PDF").await;
        let node = upload_file(&drive, temp, &mangled, "materials", Some("application/pdf"))
            .await
            .unwrap();

        assert_eq!(node.name, "Лекция 1.pdf");
        assert_eq!(drive.find_by_name("Лекция 1.pdf").unwrap().id, node.id);
    }

    #[test]
    fn test_state_transitions() {
        use UploadState::*;
        assert!(Received.can_transition_to(Validated));
        assert!(Validated.can_transition_to(Streaming));
        assert!(Streaming.can_transition_to(Committed));
        assert!(Received.can_transition_to(Failed));
        assert!(Streaming.can_transition_to(Failed));
        assert!(!Received.can_transition_to(Committed));
        assert!(!Committed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Committed));
        assert!(Committed.is_terminal() && Failed.is_terminal());
        assert!(!Streaming.is_terminal());
    }
}
