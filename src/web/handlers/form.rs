//! Multipart upload forms.

use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;

use crate::upload::{TempUpload, UploadError};
use crate::web::error::ApiError;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// The spooled file of an upload form.
#[derive(Debug)]
pub struct SpooledFile {
    pub temp: TempUpload,
    /// Filename as sent by the client, before repair.
    pub filename: String,
    pub content_type: Option<String>,
}

/// A parsed upload form: at most one file plus text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<SpooledFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Trimmed, non-empty text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Take the file, or fail with [`UploadError::MissingFile`].
    pub fn take_file(&mut self) -> Result<SpooledFile, ApiError> {
        self.file.take().ok_or_else(|| UploadError::MissingFile.into())
    }
}

/// Read a multipart body, streaming the `file` field to a spool file.
///
/// Only the first file is kept. If reading fails midway the spool file is
/// dropped, which deletes it.
pub async fn read_upload_form(
    mut multipart: Multipart,
    temp_dir: &Path,
    max_bytes: u64,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);

            if form.file.is_some() || filename.is_empty() {
                // Drain extra or empty file inputs.
                while field.chunk().await?.is_some() {}
                continue;
            }

            let mut temp = TempUpload::create(temp_dir, max_bytes).await?;
            while let Some(chunk) = field.chunk().await? {
                temp.write_chunk(&chunk).await?;
            }
            temp.finish().await?;

            tracing::debug!(filename = %filename, size = temp.size(), "Spooled upload");
            form.file = Some(SpooledFile {
                temp,
                filename,
                content_type,
            });
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
