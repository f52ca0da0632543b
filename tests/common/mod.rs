//! Shared setup for web API tests.
//!
//! Builds the real router over an in-memory database, a [`MemoryDrive`] and a
//! scripted identity provider.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::HeaderValue;
use axum_test::TestServer;
use tempfile::TempDir;

use classdrive::auth::{
    AccessToken, IdentityProvider, ServiceCredentials, SessionData, StaticToken, TeacherIdentity,
    TokenSet, UserInfo,
};
use classdrive::config::Config;
use classdrive::db::{CredentialRepository, StudentTargetRepository, TeacherRecord, TeacherRepository};
use classdrive::drive::{MemoryConnector, MemoryDrive};
use classdrive::web::middleware::RateLimitState;
use classdrive::web::{create_app, AppState};
use classdrive::{AppError, Database, Result};

pub const TEACHER_EMAIL: &str = "frizzle@school.test";
pub const TEACHER_NAME: &str = "Ms. Frizzle";
pub const MATERIALS_ID: &str = "materials";
pub const INBOX_ID: &str = "inbox";
pub const STORED_REFRESH_TOKEN: &str = "refresh-stored";
pub const SERVICE_TOKEN: &str = "service-token";
pub const COOKIE_NAME: &str = "classdrive_session";

/// Identity provider with predictable states, codes and tokens.
#[derive(Default)]
pub struct ScriptedProvider {
    issued: AtomicUsize,
    exchanges: AtomicUsize,
    revoked: Mutex<HashSet<String>>,
    email: Mutex<String>,
}

impl ScriptedProvider {
    pub fn new(email: &str) -> Self {
        let provider = Self::default();
        provider.set_email(email);
        provider
    }

    pub fn set_email(&self, email: &str) {
        *self.email.lock().unwrap() = email.to_string();
    }

    pub fn revoke(&self, refresh_token: &str) {
        self.revoked.lock().unwrap().insert(refresh_token.to_string());
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn authorization_url(&self) -> (String, String) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let state = format!("state-{n}");
        (format!("https://accounts.test/auth?state={state}"), state)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == "bad-code" {
            return Err(AppError::Auth("invalid_grant".to_string()));
        }
        Ok(TokenSet {
            access_token: AccessToken::new(format!("access-{code}")),
            refresh_token: Some(format!("refresh-{code}")),
            expires_in: None,
        })
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken> {
        if self.revoked.lock().unwrap().contains(refresh_token) {
            return Err(AppError::ReauthenticationRequired("invalid_grant".to_string()));
        }
        Ok(AccessToken::new(format!("fresh-{refresh_token}")))
    }

    async fn user_info(&self, _token: &AccessToken) -> Result<UserInfo> {
        Ok(UserInfo {
            email: self.email.lock().unwrap().clone(),
            name: Some(TEACHER_NAME.to_string()),
            picture: None,
        })
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub db: Database,
    pub drive: Arc<MemoryDrive>,
    pub provider: Arc<ScriptedProvider>,
    pub temp_dir: TempDir,
}

impl TestApp {
    /// App with service credentials configured.
    pub async fn new() -> Self {
        Self::build(true).await
    }

    /// App where student uploads are disabled.
    pub async fn without_service_credentials() -> Self {
        Self::build(false).await
    }

    async fn build(with_service: bool) -> Self {
        let temp_dir = tempfile::tempdir().expect("tempdir");

        let mut config = Config::default();
        config.drive.backend = "memory".to_string();
        config.uploads.temp_dir = temp_dir.path().join("spool").display().to_string();
        config.uploads.max_upload_size_mb = 1;
        config.oauth.allowed_teachers = vec![TEACHER_EMAIL.to_string()];
        config.session.secure = false;
        config.web.login_rate_limit = 1000;
        config.web.upload_rate_limit = 1000;

        let db = Database::open_in_memory().await.expect("database");
        TeacherRepository::new(db.pool())
            .upsert(&TeacherRecord {
                email: TEACHER_EMAIL.to_string(),
                folder_id: MATERIALS_ID.to_string(),
                name: TEACHER_NAME.to_string(),
                active: true,
            })
            .await
            .expect("teacher");
        StudentTargetRepository::new(db.pool())
            .set_folder(TEACHER_EMAIL, INBOX_ID)
            .await
            .expect("student target");
        CredentialRepository::new(db.pool())
            .save(TEACHER_EMAIL, STORED_REFRESH_TOKEN)
            .await
            .expect("credential");

        let drive = Arc::new(MemoryDrive::new());
        drive.insert_folder(MATERIALS_ID, "Materials", None);
        drive.insert_folder(INBOX_ID, "Submissions", None);

        let provider = Arc::new(ScriptedProvider::new(TEACHER_EMAIL));
        let service: Option<Arc<dyn ServiceCredentials>> = if with_service {
            Some(Arc::new(StaticToken::new(SERVICE_TOKEN)))
        } else {
            None
        };

        let state = Arc::new(AppState::new(
            db.clone(),
            &config,
            provider.clone(),
            Arc::new(MemoryConnector::new(drive.clone())),
            service,
        ));
        let rate_limits = Arc::new(RateLimitState::new(
            config.web.login_rate_limit,
            config.web.upload_rate_limit,
        ));
        let router = create_app(state.clone(), rate_limits, &config.web);
        let server = TestServer::new(router).expect("test server");

        Self {
            server,
            state,
            db,
            drive,
            provider,
            temp_dir,
        }
    }

    /// Session id of a logged-in teacher.
    pub async fn teacher_session(&self, email: &str) -> String {
        self.state
            .sessions
            .create(&SessionData {
                teacher: Some(TeacherIdentity {
                    email: email.to_string(),
                    name: Some(TEACHER_NAME.to_string()),
                    picture: None,
                }),
                ..SessionData::default()
            })
            .await
            .expect("session")
    }

    /// Number of files left in the upload spool directory.
    pub fn spooled_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path().join("spool"))
            .map(|d| d.count())
            .unwrap_or(0)
    }
}

/// `Cookie` header value carrying a session id.
pub fn session_cookie(session_id: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{COOKIE_NAME}={session_id}")).expect("cookie header")
}

/// Session id set by a response, if any.
pub fn set_session_id(response: &axum_test::TestResponse) -> Option<String> {
    response.maybe_cookie(COOKIE_NAME).map(|c| c.value().to_string())
}
