//! Web API OAuth Tests
//!
//! Teacher login, callback state checks, logout and the public endpoints.

mod common;

use axum::http::{header, StatusCode};
use serde_json::Value;

use classdrive::auth::SessionData;
use classdrive::db::CredentialRepository;
use common::{session_cookie, set_session_id, TestApp, STORED_REFRESH_TOKEN, TEACHER_EMAIL};

/// Start a login and return the session id and issued state.
async fn start_login(app: &TestApp, redirect_to: Option<&str>) -> (String, String) {
    let mut request = app.server.get("/teacher/login");
    if let Some(target) = redirect_to {
        request = request.add_query_param("redirectTo", target);
    }
    let response = request.await;
    response.assert_status(StatusCode::SEE_OTHER);

    let session_id = set_session_id(&response).expect("session cookie");
    let data = app.state.sessions.load(&session_id).await.unwrap().unwrap();
    (session_id, data.oauth_state.expect("pending state"))
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/teacher/login")
        .add_query_param("redirectTo", "/teacher/dashboard?folderId=unit1")
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(
        response.header("location"),
        "https://accounts.test/auth?state=state-0"
    );

    let session_id = set_session_id(&response).unwrap();
    let data = app.state.sessions.load(&session_id).await.unwrap().unwrap();
    assert_eq!(data.oauth_state.as_deref(), Some("state-0"));
    assert_eq!(data.redirect_to.as_deref(), Some("/teacher/dashboard?folderId=unit1"));
    assert!(data.teacher.is_none());
}

#[tokio::test]
async fn test_login_ignores_foreign_redirect() {
    let app = TestApp::new().await;

    let (session_id, _) = start_login(&app, Some("https://evil.test/phish")).await;

    let data = app.state.sessions.load(&session_id).await.unwrap().unwrap();
    assert!(data.redirect_to.is_none());
}

// ============================================================================
// Callback
// ============================================================================

#[tokio::test]
async fn test_callback_state_mismatch() {
    let app = TestApp::new().await;
    let (session_id, state) = start_login(&app, None).await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "good-code")
        .add_query_param("state", "forged")
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.provider.exchange_count(), 0);

    let data = app.state.sessions.load(&session_id).await.unwrap().unwrap();
    assert_eq!(data.oauth_state, Some(state));
    assert!(data.teacher.is_none());
}

#[tokio::test]
async fn test_callback_without_session() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "good-code")
        .add_query_param("state", "state-0")
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.provider.exchange_count(), 0);
}

#[tokio::test]
async fn test_callback_logs_in() {
    let app = TestApp::new().await;
    let (session_id, state) = start_login(&app, Some("/teacher/api/folder/unit1")).await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "good-code")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/teacher/api/folder/unit1");

    let stored = CredentialRepository::new(app.db.pool())
        .get(TEACHER_EMAIL)
        .await
        .unwrap();
    assert_eq!(stored.as_deref(), Some("refresh-good-code"));

    let new_id = set_session_id(&response).unwrap();
    assert_ne!(new_id, session_id);
    assert!(app.state.sessions.load(&session_id).await.unwrap().is_none());

    let data = app.state.sessions.load(&new_id).await.unwrap().unwrap();
    assert_eq!(data.teacher.unwrap().email, TEACHER_EMAIL);
    assert!(data.oauth_state.is_none());
}

#[tokio::test]
async fn test_callback_state_is_single_use() {
    let app = TestApp::new().await;
    let (session_id, state) = start_login(&app, None).await;

    app.server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "bad-code")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let replay = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "good-code")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    replay.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(app.provider.exchange_count(), 1);
}

#[tokio::test]
async fn test_callback_exchange_failure() {
    let app = TestApp::new().await;
    let (session_id, state) = start_login(&app, None).await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "bad-code")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/?error=auth_failed");

    let stored = CredentialRepository::new(app.db.pool())
        .get(TEACHER_EMAIL)
        .await
        .unwrap();
    assert_eq!(stored.as_deref(), Some(STORED_REFRESH_TOKEN));
}

#[tokio::test]
async fn test_callback_provider_error() {
    let app = TestApp::new().await;
    let (session_id, state) = start_login(&app, None).await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("error", "access_denied")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/?error=auth_failed");
    assert_eq!(app.provider.exchange_count(), 0);
}

#[tokio::test]
async fn test_callback_teacher_off_allowlist() {
    let app = TestApp::new().await;
    app.provider.set_email("Stranger@School.test");
    let (session_id, state) = start_login(&app, None).await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "good-code")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let stored = CredentialRepository::new(app.db.pool())
        .get("stranger@school.test")
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_callback_lowercases_email() {
    let app = TestApp::new().await;
    app.provider.set_email("Frizzle@School.TEST");
    let (session_id, state) = start_login(&app, None).await;

    let response = app
        .server
        .get("/teacher/oauth2callback")
        .add_query_param("code", "good-code")
        .add_query_param("state", &state)
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/teacher");

    let new_id = set_session_id(&response).unwrap();
    let data = app.state.sessions.load(&new_id).await.unwrap().unwrap();
    assert_eq!(data.teacher.unwrap().email, TEACHER_EMAIL);
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_destroys_session() {
    let app = TestApp::new().await;
    let session_id = app.teacher_session(TEACHER_EMAIL).await;

    let response = app
        .server
        .get("/teacher/logout")
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
    assert!(app.state.sessions.load(&session_id).await.unwrap().is_none());

    app.server
        .get("/teacher/dashboard")
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await
        .assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_logout_without_session() {
    let app = TestApp::new().await;

    let response = app.server.get("/teacher/logout").await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_expired_session_is_anonymous() {
    let app = TestApp::new().await;
    let session_id = app
        .state
        .sessions
        .create(&SessionData::default())
        .await
        .unwrap();
    app.state.sessions.destroy(&session_id).await.unwrap();

    let response = app
        .server
        .get("/teacher")
        .add_header(header::COOKIE, session_cookie(&session_id))
        .await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert!(response.header("location").to_str().unwrap().starts_with("/teacher/login"));
}

// ============================================================================
// Public Endpoints
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = TestApp::new().await;

    let response = app.server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();

    let json: Value = response.json();
    assert!(json["paths"]["/upload"].is_object());
    assert!(json["paths"]["/teacher/oauth2callback"].is_object());
}
