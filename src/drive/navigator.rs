//! Folder listing.

use serde::Serialize;
use utoipa::ToSchema;

use super::{DriveApi, DriveError, ListChildrenRequest, RemoteNode};

/// Children of a folder split by kind, each half keeping recency order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FolderListing {
    pub folders: Vec<RemoteNode>,
    pub files: Vec<RemoteNode>,
}

impl FolderListing {
    /// Partition nodes into folders and files.
    pub fn partition(nodes: Vec<RemoteNode>) -> Self {
        let (folders, files) = nodes.into_iter().partition(RemoteNode::is_folder);
        Self { folders, files }
    }
}

/// List the immediate children of `folder_id`, newest first.
///
/// Only the first `page_size` entries are fetched. Larger folders are
/// silently truncated.
pub async fn list_children(
    drive: &dyn DriveApi,
    folder_id: &str,
    page_size: u32,
) -> Result<Vec<RemoteNode>, DriveError> {
    let request = ListChildrenRequest::new(folder_id).with_page_size(page_size);
    let children = drive.list_children(&request).await?;
    tracing::debug!(folder_id, count = children.len(), "Listed folder");
    Ok(children)
}
