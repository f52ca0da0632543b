//! Request DTOs for the web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

/// Create a folder under `folderId`, or under the teacher's root.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    #[validate(
        length(min = 1, max = 255, message = "Must be between 1 and 255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub folder_name: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

/// Move an item to the trash.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItemRequest {
    #[validate(custom(function = "not_empty_trimmed"))]
    pub item_id: String,
}

/// `GET /teacher-files?teacherEmail=`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct TeacherEmailQuery {
    pub teacher_email: Option<String>,
}

/// `GET /teacher/teacher-files?teacher=`
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherQuery {
    pub teacher: Option<String>,
}

/// `GET /teacher/dashboard?folderId=`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct FolderQuery {
    pub folder_id: Option<String>,
}

/// `GET /teacher/login?redirectTo=`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub redirect_to: Option<String>,
}

/// Provider redirect back to `/teacher/oauth2callback`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
