//! Cookie-referenced server-side sessions.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{SessionData, TeacherIdentity};
use crate::web::error::{ApiError, LOGIN_PATH};
use crate::web::state::AppState;

/// Name and flags of the session cookie.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
}

impl SessionCookie {
    pub fn new(name: &str, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            secure,
        }
    }

    /// Session id carried by the request, if any.
    pub fn read(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn set(&self, jar: CookieJar, session_id: &str) -> CookieJar {
        let cookie = Cookie::build((self.name.clone(), session_id.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax);
        jar.add(cookie)
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((self.name.clone(), "")).path("/"))
    }
}

/// The caller's session. `id` is `None` when no live session exists yet.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    pub id: Option<String>,
    pub data: SessionData,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(id) = state.cookie.read(&jar) else {
            return Ok(CurrentSession::default());
        };

        match state.sessions.load(&id).await? {
            Some(data) => Ok(CurrentSession { id: Some(id), data }),
            None => Ok(CurrentSession::default()),
        }
    }
}

/// A logged-in teacher on the allow-list.
///
/// Without a login the request is redirected to the login page, carrying the
/// original path in `redirectTo`. Logged-in users off the allow-list get 403.
#[derive(Debug, Clone)]
pub struct TeacherSession {
    pub session_id: String,
    pub teacher: TeacherIdentity,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for TeacherSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let (Some(session_id), Some(teacher)) = (session.id, session.data.teacher) else {
            // Nested routers see the path with the prefix stripped.
            let uri = parts
                .extensions
                .get::<OriginalUri>()
                .map(|original| &original.0)
                .unwrap_or(&parts.uri);
            let target = uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/teacher");
            let location = format!("{}?redirectTo={}", LOGIN_PATH, urlencoding::encode(target));
            return Err(Redirect::to(&location).into_response());
        };

        if !state.allowlist.is_allowed(&teacher.email) {
            tracing::warn!(email = %teacher.email, "Teacher route refused, not on allow-list");
            return Err(ApiError::forbidden("Teacher access only").into_response());
        }

        Ok(TeacherSession {
            session_id,
            teacher,
        })
    }
}

/// Whether `target` is a path on this site, safe to redirect to.
pub fn is_local_redirect(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
