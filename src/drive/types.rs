//! Value types exchanged with the remote drive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::FOLDER_MIME_TYPE;

/// Fields requested for every node.
pub const NODE_FIELDS: &str = "id,name,mimeType,modifiedTime,webViewLink,iconLink,parents";

/// A file or folder in the remote drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
    /// Parent folder ids. Drive allows several.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl RemoteNode {
    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
}

/// Listing request for the direct children of a folder.
///
/// Defaults: untrashed children, [`NODE_FIELDS`], newest first, 10 entries.
/// Only one page is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChildrenRequest {
    pub folder_id: String,
    /// Field mask applied to each returned node.
    pub fields: String,
    pub order_by: String,
    pub page_size: u32,
}

/// Default listing page size.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

impl ListChildrenRequest {
    /// Listing with the default field mask, ordering and page size.
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            fields: NODE_FIELDS.to_string(),
            order_by: "modifiedTime desc".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Drive query expression selecting untrashed children of the folder.
    pub fn query(&self) -> String {
        format!(
            "'{}' in parents and trashed = false",
            escape_query_value(&self.folder_id)
        )
    }
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Metadata for a new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFileRequest {
    pub name: String,
    pub parent_id: String,
    pub mime_type: String,
}

/// Metadata for a new folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFolderRequest {
    pub name: String,
    pub parent_id: String,
}
