//! OpenAPI document.

use utoipa::OpenApi;

use crate::drive::{Breadcrumb, RemoteNode};
use crate::web::dto::{
    CreateFolderRequest, CreatedItemResponse, DashboardResponse, DeleteItemRequest,
    DeleteItemResponse, FileListResponse, FolderViewResponse, StudentHomeResponse,
    TeacherFilesResponse, TeacherSummary,
};
use crate::web::handlers::{oauth, student, teacher};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "classdrive",
        description = "Student submissions and teacher materials stored in Google Drive"
    ),
    paths(
        student::list_teachers,
        student::teacher_files,
        student::upload,
        oauth::login,
        oauth::callback,
        oauth::logout,
        teacher::dashboard,
        teacher::folder_view,
        teacher::teacher_files,
        teacher::upload,
        teacher::create_folder,
        teacher::delete_item,
    ),
    components(schemas(
        RemoteNode,
        Breadcrumb,
        TeacherSummary,
        StudentHomeResponse,
        FileListResponse,
        FolderViewResponse,
        DashboardResponse,
        TeacherFilesResponse,
        CreatedItemResponse,
        DeleteItemResponse,
        CreateFolderRequest,
        DeleteItemRequest,
    )),
    tags(
        (name = "student", description = "Public student pages"),
        (name = "auth", description = "Teacher login"),
        (name = "teacher", description = "Teacher materials")
    )
)]
pub struct ApiDoc;
