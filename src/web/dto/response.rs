//! Response DTOs for the web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::db::TeacherRecord;
use crate::drive::navigator::FolderListing;
use crate::drive::{Breadcrumb, RemoteNode};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Teacher shown on the student landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TeacherSummary {
    pub email: String,
    pub name: String,
}

impl From<TeacherRecord> for TeacherSummary {
    fn from(record: TeacherRecord) -> Self {
        Self {
            email: record.email,
            name: record.name,
        }
    }
}

/// Student landing data.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentHomeResponse {
    pub teachers: Vec<TeacherSummary>,
    /// Recent materials of the first teacher.
    pub files: Vec<RemoteNode>,
    /// False when no service credentials are configured.
    pub uploads_enabled: bool,
}

/// Flat list of drive nodes.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<RemoteNode>,
}

/// One folder with its children and the path leading to it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderViewResponse {
    pub folder_id: String,
    pub folders: Vec<RemoteNode>,
    pub files: Vec<RemoteNode>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl FolderViewResponse {
    pub fn new(folder_id: String, listing: FolderListing, breadcrumbs: Vec<Breadcrumb>) -> Self {
        Self {
            folder_id,
            folders: listing.folders,
            files: listing.files,
            breadcrumbs,
        }
    }
}

/// Teacher dashboard data.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub teacher_email: String,
    pub teacher_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_picture: Option<String>,
    pub teacher_material_folder_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_upload_folder_id: Option<String>,
    pub current_folder_id: String,
    pub folders: Vec<RemoteNode>,
    pub files: Vec<RemoteNode>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// A teacher's materials next to the student submissions they received.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherFilesResponse {
    pub teacher_files: Vec<RemoteNode>,
    pub student_files: Vec<RemoteNode>,
}

/// Result of a teacher upload or folder creation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItemResponse {
    pub item: RemoteNode,
    pub parent_id: String,
}

/// Result of moving an item to the trash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItemResponse {
    pub item_id: String,
    pub trashed: bool,
}
