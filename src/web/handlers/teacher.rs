//! Teacher area: dashboard, folder browsing and material management.
//!
//! Every handler acts on the logged-in teacher's own drive with a freshly
//! refreshed access token, and only inside the teacher's materials folder.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};

use crate::drive::breadcrumb::{build_path, starts_at_root};
use crate::drive::navigator::{self, FolderListing};
use crate::drive::{Breadcrumb, CreateFolderRequest as NewFolder, DriveApi};
use crate::upload::upload_file;
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, CreatedItemResponse, DashboardResponse, DeleteItemRequest,
    DeleteItemResponse, FolderQuery, FolderViewResponse, TeacherFilesResponse, TeacherQuery,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::TeacherSession;
use crate::web::state::AppState;

use super::form::read_upload_form;

/// Trail from `root_id` to `folder_id`, or an error if the folder lies elsewhere.
async fn trail_within_root(
    drive: &dyn DriveApi,
    folder_id: &str,
    root_id: &str,
) -> Result<Vec<Breadcrumb>, Vec<Breadcrumb>> {
    let path = build_path(drive, folder_id, root_id).await;
    if starts_at_root(&path, root_id) {
        Ok(path)
    } else {
        Err(path)
    }
}

/// Listing and breadcrumbs of a folder inside the teacher's root.
async fn load_folder(
    drive: &dyn DriveApi,
    folder_id: &str,
    root_id: &str,
    page_size: u32,
) -> Result<(FolderListing, Vec<Breadcrumb>), ApiError> {
    let breadcrumbs = trail_within_root(drive, folder_id, root_id)
        .await
        .map_err(|_| {
            tracing::info!(folder_id, root_id, "Folder outside the teacher's materials");
            ApiError::outside_root("Folder is not part of your materials")
        })?;
    let children = navigator::list_children(drive, folder_id, page_size).await?;
    Ok((FolderListing::partition(children), breadcrumbs))
}

/// Destination folder for a write: `requested` if it lies inside the root.
async fn writable_folder(
    drive: &dyn DriveApi,
    requested: Option<&str>,
    root_id: &str,
) -> Result<String, ApiError> {
    let Some(folder_id) = requested.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(root_id.to_string());
    };
    if folder_id == root_id {
        return Ok(root_id.to_string());
    }
    trail_within_root(drive, folder_id, root_id)
        .await
        .map_err(|_| ApiError::forbidden("Folder is not part of your materials"))?;
    Ok(folder_id.to_string())
}

/// GET /teacher/dashboard - Dashboard data for the root or `folderId`.
#[utoipa::path(
    get,
    path = "/teacher/dashboard",
    tag = "teacher",
    params(FolderQuery),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 303, description = "Not logged in, or drive access must be renewed"),
        (status = 403, description = "Not an allowed teacher"),
        (status = 404, description = "No teacher record, or folder outside the materials")
    )
)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    TeacherSession { teacher, .. }: TeacherSession,
    Query(query): Query<FolderQuery>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let record = state.resolver.teacher(&teacher.email).await?;
    let student_folder = state
        .resolver
        .resolve_student_upload_folder(&teacher.email)
        .await?;

    let drive = state.teacher_drive(&teacher.email).await?;
    let current = query
        .folder_id
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| record.folder_id.clone());
    let (listing, breadcrumbs) =
        load_folder(drive.as_ref(), &current, &record.folder_id, state.page_size).await?;

    Ok(Json(ApiResponse::new(DashboardResponse {
        teacher_email: teacher.email,
        teacher_name: teacher.name.unwrap_or(record.name),
        teacher_picture: teacher.picture,
        teacher_material_folder_id: record.folder_id,
        student_upload_folder_id: student_folder,
        current_folder_id: current,
        folders: listing.folders,
        files: listing.files,
        breadcrumbs,
    })))
}

/// GET /teacher/api/folder/{id} - One folder of the teacher's materials.
#[utoipa::path(
    get,
    path = "/teacher/api/folder/{id}",
    tag = "teacher",
    params(("id" = String, Path, description = "Drive folder id")),
    responses(
        (status = 200, description = "Folder view", body = FolderViewResponse),
        (status = 303, description = "Not logged in, or drive access must be renewed"),
        (status = 404, description = "Folder outside the materials (redirectToRoot)")
    )
)]
pub async fn folder_view(
    State(state): State<Arc<AppState>>,
    TeacherSession { teacher, .. }: TeacherSession,
    Path(folder_id): Path<String>,
) -> Result<Json<ApiResponse<FolderViewResponse>>, ApiError> {
    let root = state.resolver.resolve_teacher_folder(&teacher.email).await?;
    let drive = state.teacher_drive(&teacher.email).await?;

    let (listing, breadcrumbs) =
        load_folder(drive.as_ref(), &folder_id, &root, state.page_size).await?;

    Ok(Json(ApiResponse::new(FolderViewResponse::new(
        folder_id,
        listing,
        breadcrumbs,
    ))))
}

/// GET /teacher/teacher-files - Own materials plus received submissions.
///
/// Teachers can only ask for their own listing.
#[utoipa::path(
    get,
    path = "/teacher/teacher-files",
    tag = "teacher",
    params(TeacherQuery),
    responses(
        (status = 200, description = "Materials and submissions", body = TeacherFilesResponse),
        (status = 403, description = "Another teacher's listing")
    )
)]
pub async fn teacher_files(
    State(state): State<Arc<AppState>>,
    TeacherSession { teacher, .. }: TeacherSession,
    Query(query): Query<TeacherQuery>,
) -> Result<Json<ApiResponse<TeacherFilesResponse>>, ApiError> {
    if let Some(requested) = query.teacher.as_deref().map(str::trim) {
        if !requested.is_empty() && !requested.eq_ignore_ascii_case(&teacher.email) {
            return Err(ApiError::forbidden("You can only list your own files"));
        }
    }

    let root = state.resolver.resolve_teacher_folder(&teacher.email).await?;
    let drive = state.teacher_drive(&teacher.email).await?;
    let teacher_files = navigator::list_children(drive.as_ref(), &root, state.page_size).await?;

    // Submissions are written with the service credentials, so read them the same way.
    let student_folder = state
        .resolver
        .resolve_student_upload_folder(&teacher.email)
        .await?;
    let student_files = match (student_folder, state.service_drive().await?) {
        (Some(folder), Some(service)) => {
            navigator::list_children(service.as_ref(), &folder, state.page_size).await?
        }
        _ => Vec::new(),
    };

    Ok(Json(ApiResponse::new(TeacherFilesResponse {
        teacher_files,
        student_files,
    })))
}

/// POST /teacher/upload - Add a file to the materials.
///
/// Multipart fields: `file` and optional `folderId` (defaults to the root).
#[utoipa::path(
    post,
    path = "/teacher/upload",
    tag = "teacher",
    request_body(content_type = "multipart/form-data", description = "Fields `file` and optional `folderId`"),
    responses(
        (status = 200, description = "Uploaded", body = CreatedItemResponse),
        (status = 400, description = "No file"),
        (status = 403, description = "Folder outside the materials"),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    TeacherSession { teacher, .. }: TeacherSession,
    multipart: Multipart,
) -> Result<Json<ApiResponse<CreatedItemResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, &state.temp_dir, state.max_upload_bytes).await?;
    let file = form.take_file()?;

    let root = state.resolver.resolve_teacher_folder(&teacher.email).await?;
    let drive = state.teacher_drive(&teacher.email).await?;
    let parent_id = writable_folder(drive.as_ref(), form.field("folderId"), &root).await?;

    let item = upload_file(
        drive.as_ref(),
        file.temp,
        &file.filename,
        &parent_id,
        file.content_type.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::new(CreatedItemResponse { item, parent_id })))
}

/// POST /teacher/create-folder - Create a folder in the materials.
#[utoipa::path(
    post,
    path = "/teacher/create-folder",
    tag = "teacher",
    request_body = CreateFolderRequest,
    responses(
        (status = 200, description = "Folder created", body = CreatedItemResponse),
        (status = 403, description = "Parent outside the materials"),
        (status = 422, description = "Invalid folder name")
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    TeacherSession { teacher, .. }: TeacherSession,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<Json<ApiResponse<CreatedItemResponse>>, ApiError> {
    let root = state.resolver.resolve_teacher_folder(&teacher.email).await?;
    let drive = state.teacher_drive(&teacher.email).await?;
    let parent_id = writable_folder(drive.as_ref(), req.folder_id.as_deref(), &root).await?;

    let item = drive
        .create_folder(&NewFolder {
            name: req.folder_name.trim().to_string(),
            parent_id: parent_id.clone(),
        })
        .await?;
    tracing::info!(email = %teacher.email, folder_id = %item.id, parent_id = %parent_id, "Folder created");

    Ok(Json(ApiResponse::new(CreatedItemResponse { item, parent_id })))
}

/// POST /teacher/delete-item - Move a file or folder to the trash.
#[utoipa::path(
    post,
    path = "/teacher/delete-item",
    tag = "teacher",
    request_body = DeleteItemRequest,
    responses(
        (status = 200, description = "Trashed", body = DeleteItemResponse),
        (status = 400, description = "The materials folder itself"),
        (status = 403, description = "Item outside the materials"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    TeacherSession { teacher, .. }: TeacherSession,
    ValidatedJson(req): ValidatedJson<DeleteItemRequest>,
) -> Result<Json<ApiResponse<DeleteItemResponse>>, ApiError> {
    let item_id = req.item_id.trim().to_string();
    let root = state.resolver.resolve_teacher_folder(&teacher.email).await?;
    if item_id == root {
        return Err(ApiError::bad_request("The materials folder cannot be deleted"));
    }

    let drive = state.teacher_drive(&teacher.email).await?;
    if let Err(path) = trail_within_root(drive.as_ref(), &item_id, &root).await {
        return Err(if path.is_empty() {
            ApiError::not_found("Drive item not found")
        } else {
            ApiError::forbidden("Item is not part of your materials")
        });
    }

    drive.trash(&item_id).await?;
    tracing::info!(email = %teacher.email, item_id = %item_id, "Item trashed");

    Ok(Json(ApiResponse::new(DeleteItemResponse {
        item_id,
        trashed: true,
    })))
}
