//! Student-facing handlers. No login; drive access uses the service credentials.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    response::Redirect,
    Json,
};

use crate::drive::navigator;
use crate::upload::upload_file;
use crate::web::dto::{
    ApiResponse, FileListResponse, StudentHomeResponse, TeacherEmailQuery, TeacherSummary,
};
use crate::web::error::ApiError;
use crate::web::state::AppState;

use super::form::read_upload_form;

/// Where the browser lands after a successful submission.
const UPLOAD_SUCCESS_PATH: &str = "/?success=1";

/// GET /api/teachers - Active teachers and the first teacher's recent materials.
#[utoipa::path(
    get,
    path = "/api/teachers",
    tag = "student",
    responses(
        (status = 200, description = "Landing data", body = StudentHomeResponse),
        (status = 500, description = "Drive listing failed")
    )
)]
pub async fn list_teachers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StudentHomeResponse>>, ApiError> {
    let teachers = state.resolver.list_active_teachers().await?;

    let files = match (teachers.first(), state.service_drive().await?) {
        (Some(first), Some(drive)) => {
            navigator::list_children(drive.as_ref(), &first.folder_id, state.page_size).await?
        }
        _ => Vec::new(),
    };

    Ok(Json(ApiResponse::new(StudentHomeResponse {
        teachers: teachers.into_iter().map(TeacherSummary::from).collect(),
        files,
        uploads_enabled: state.service_credentials.is_some(),
    })))
}

/// GET /teacher-files - Recent materials of one teacher.
#[utoipa::path(
    get,
    path = "/teacher-files",
    tag = "student",
    params(TeacherEmailQuery),
    responses(
        (status = 200, description = "Teacher materials", body = FileListResponse),
        (status = 400, description = "Missing teacherEmail"),
        (status = 404, description = "Unknown or inactive teacher"),
        (status = 503, description = "No service credentials configured")
    )
)]
pub async fn teacher_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TeacherEmailQuery>,
) -> Result<Json<ApiResponse<FileListResponse>>, ApiError> {
    let email = query
        .teacher_email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("teacherEmail is required"))?;

    let teacher = state.resolver.teacher(email).await?;
    if !teacher.active {
        return Err(ApiError::not_found("teacher not found"));
    }

    let drive = state
        .service_drive()
        .await?
        .ok_or_else(|| ApiError::service_unavailable("Student access is not configured"))?;
    let files = navigator::list_children(drive.as_ref(), &teacher.folder_id, state.page_size).await?;

    Ok(Json(ApiResponse::new(FileListResponse { files })))
}

/// POST /upload - Student submission.
///
/// Multipart fields: `file` and `teacherEmail`. The file always goes to the
/// teacher's student-upload folder, never to the materials folder.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "student",
    request_body(content_type = "multipart/form-data", description = "Fields `file` and `teacherEmail`"),
    responses(
        (status = 303, description = "Uploaded, redirect to /?success=1"),
        (status = 400, description = "Missing file or teacherEmail"),
        (status = 404, description = "No upload folder for this teacher"),
        (status = 413, description = "File too large"),
        (status = 429, description = "Rate limited"),
        (status = 500, description = "Upload folder misconfigured or drive failure"),
        (status = 503, description = "No service credentials configured")
    )
)]
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Redirect, ApiError> {
    if state.service_credentials.is_none() {
        return Err(ApiError::service_unavailable("Student uploads are not configured"));
    }

    let mut form = read_upload_form(multipart, &state.temp_dir, state.max_upload_bytes).await?;
    let file = form.take_file()?;
    let email = form
        .field("teacherEmail")
        .ok_or_else(|| ApiError::bad_request("teacherEmail is required"))?
        .to_string();

    let destination = state
        .resolver
        .student_submission_folder(&email)
        .await?
        .ok_or_else(|| {
            tracing::info!(teacher = %email, "Student upload without a configured folder");
            ApiError::not_found("This teacher has no upload folder yet")
        })?;

    let drive = state
        .service_drive()
        .await?
        .ok_or_else(|| ApiError::service_unavailable("Student uploads are not configured"))?;

    upload_file(
        drive.as_ref(),
        file.temp,
        &file.filename,
        &destination,
        file.content_type.as_deref(),
    )
    .await?;

    tracing::info!(teacher = %email, "Student submission stored");
    Ok(Redirect::to(UPLOAD_SUCCESS_PATH))
}
