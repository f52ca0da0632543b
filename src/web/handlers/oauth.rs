//! Teacher login through the identity provider.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{SessionData, TeacherIdentity};
use crate::db::CredentialRepository;
use crate::web::dto::{LoginQuery, OAuthCallbackQuery};
use crate::web::error::ApiError;
use crate::web::middleware::{is_local_redirect, CurrentSession};
use crate::web::state::AppState;

/// Landing page after login when no `redirectTo` was given.
const DEFAULT_TEACHER_PATH: &str = "/teacher";
/// Where failed logins end up.
const AUTH_FAILED_PATH: &str = "/?error=auth_failed";

/// GET /teacher/login - Start the authorization code flow.
#[utoipa::path(
    get,
    path = "/teacher/login",
    tag = "auth",
    params(LoginQuery),
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let (url, csrf_state) = state.identity.authorization_url();

    let mut data = session.data;
    data.oauth_state = Some(csrf_state);
    data.redirect_to = query.redirect_to.filter(|t| is_local_redirect(t));

    let jar = match session.id {
        Some(id) => {
            state.sessions.save(&id, &data).await?;
            jar
        }
        None => {
            let id = state.sessions.create(&data).await?;
            state.cookie.set(jar, &id)
        }
    };

    Ok((jar, Redirect::to(&url)))
}

/// GET /teacher/oauth2callback - Finish the authorization code flow.
///
/// The anti-forgery state is checked before anything else. On mismatch the
/// code is never exchanged and the session is left untouched.
#[utoipa::path(
    get,
    path = "/teacher/oauth2callback",
    tag = "auth",
    params(OAuthCallbackQuery),
    responses(
        (status = 303, description = "Logged in, or redirect to /?error=auth_failed"),
        (status = 400, description = "Missing authorization code"),
        (status = 403, description = "State mismatch or not an allowed teacher")
    )
)]
pub async fn callback(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let (Some(session_id), Some(expected)) = (session.id.as_deref(), session.data.oauth_state.as_deref())
    else {
        tracing::warn!("OAuth callback without a pending login");
        return Err(ApiError::forbidden("Invalid OAuth state"));
    };
    if query.state.as_deref() != Some(expected) {
        tracing::warn!("OAuth callback state mismatch");
        return Err(ApiError::forbidden("Invalid OAuth state"));
    }

    // The state is single use from here on.
    let mut data = session.data.clone();
    data.oauth_state = None;
    let redirect_to = data.redirect_to.take();
    state.sessions.save(session_id, &data).await?;

    if let Some(error) = query.error.as_deref() {
        tracing::info!(error, "Identity provider returned an error");
        return Ok((jar, Redirect::to(AUTH_FAILED_PATH)));
    }
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let tokens = match state.identity.exchange_code(code).await {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(error = %e, "Authorization code exchange failed");
            return Ok((jar, Redirect::to(AUTH_FAILED_PATH)));
        }
    };
    let user = match state.identity.user_info(&tokens.access_token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Fetching user info failed");
            return Ok((jar, Redirect::to(AUTH_FAILED_PATH)));
        }
    };

    let email = user.email.trim().to_lowercase();
    if !state.allowlist.is_allowed(&email) {
        tracing::warn!(email = %email, "Login refused, not on allow-list");
        return Err(ApiError::forbidden("Teacher access only"));
    }

    match tokens.refresh_token.as_deref() {
        Some(refresh_token) => {
            CredentialRepository::new(state.db.pool())
                .save(&email, refresh_token)
                .await?;
        }
        None => tracing::warn!(email = %email, "No refresh token granted, keeping the stored one"),
    }

    // New session id on login.
    state.sessions.destroy(session_id).await?;
    let new_id = state
        .sessions
        .create(&SessionData {
            teacher: Some(TeacherIdentity {
                email: email.clone(),
                name: user.name,
                picture: user.picture,
            }),
            oauth_state: None,
            redirect_to: None,
        })
        .await?;

    tracing::info!(email = %email, "Teacher logged in");
    let target = redirect_to.unwrap_or_else(|| DEFAULT_TEACHER_PATH.to_string());
    Ok((state.cookie.set(jar, &new_id), Redirect::to(&target)))
}

/// GET /teacher/logout - End the session.
#[utoipa::path(
    get,
    path = "/teacher/logout",
    tag = "auth",
    responses((status = 303, description = "Logged out, redirect to /"))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(id) = session.id.as_deref() {
        state.sessions.destroy(id).await?;
        if let Some(teacher) = session.data.teacher {
            tracing::info!(email = %teacher.email, "Teacher logged out");
        }
    }
    Ok((state.cookie.clear(jar), Redirect::to("/")))
}
