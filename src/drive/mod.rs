//! Remote drive access.
//!
//! [`DriveApi`] is the capability the rest of the crate uses. Clients are
//! request-scoped: a [`DriveConnector`] turns one access token into one
//! authorized client, so no credential is ever shared between requests.

pub mod breadcrumb;
pub mod client;
pub mod memory;
pub mod navigator;
mod types;

pub use client::{DriveClient, HttpDriveConnector};
pub use memory::{MemoryConnector, MemoryDrive};
pub use types::{
    Breadcrumb, CreateFileRequest, CreateFolderRequest, ListChildrenRequest, RemoteNode,
    DEFAULT_PAGE_SIZE, NODE_FIELDS,
};

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

use crate::auth::AccessToken;

/// MIME type Drive reserves for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// File content handed to [`DriveApi::create_file`].
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync + 'static>>;

/// Errors from the remote drive.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("drive item not found: {0}")]
    NotFound(String),

    /// Access token missing, expired or revoked.
    #[error("drive rejected credentials: {0}")]
    Unauthorized(String),

    #[error("drive permission denied: {0}")]
    PermissionDenied(String),

    #[error("drive request failed: {0}")]
    Network(String),

    #[error("drive API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Reading local content failed while streaming it out.
    #[error("drive upload I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Operations on a remote drive, authorized for one principal.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch node metadata. A missing node is `Ok(None)`.
    async fn get_node(&self, id: &str) -> Result<Option<RemoteNode>, DriveError>;

    /// List one page of a folder's children.
    async fn list_children(
        &self,
        request: &ListChildrenRequest,
    ) -> Result<Vec<RemoteNode>, DriveError>;

    /// Create a file from a content stream.
    async fn create_file(
        &self,
        request: CreateFileRequest,
        content: ByteStream,
    ) -> Result<RemoteNode, DriveError>;

    async fn create_folder(&self, request: &CreateFolderRequest) -> Result<RemoteNode, DriveError>;

    /// Move a node to the trash. Trashed nodes can be restored from Drive.
    async fn trash(&self, id: &str) -> Result<(), DriveError>;
}

/// Builds request-scoped drive clients.
pub trait DriveConnector: Send + Sync {
    /// Client acting with `token`.
    fn connect(&self, token: &AccessToken) -> Arc<dyn DriveApi>;
}
