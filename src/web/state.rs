//! State shared by all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::{
    IdentityProvider, ServiceCredentials, SessionStore, TeacherAllowlist, TokenRefresher,
};
use crate::config::Config;
use crate::drive::{DriveApi, DriveConnector};
use crate::resolver::FolderResolver;
use crate::web::error::ApiError;
use crate::web::middleware::SessionCookie;
use crate::Database;

/// Application state shared across handlers.
pub struct AppState {
    pub db: Database,
    pub sessions: SessionStore,
    pub cookie: SessionCookie,
    pub identity: Arc<dyn IdentityProvider>,
    pub refresher: TokenRefresher,
    pub resolver: FolderResolver,
    pub connector: Arc<dyn DriveConnector>,
    /// Credentials for the student path. `None` disables student uploads.
    pub service_credentials: Option<Arc<dyn ServiceCredentials>>,
    pub allowlist: TeacherAllowlist,
    pub temp_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Entries fetched per folder listing.
    pub page_size: u32,
}

impl AppState {
    pub fn new(
        db: Database,
        config: &Config,
        identity: Arc<dyn IdentityProvider>,
        connector: Arc<dyn DriveConnector>,
        service_credentials: Option<Arc<dyn ServiceCredentials>>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(db.clone(), config.session.ttl_hours),
            cookie: SessionCookie::new(&config.session.cookie_name, config.session.secure),
            refresher: TokenRefresher::new(db.clone(), identity.clone()),
            resolver: FolderResolver::new(db.clone()),
            identity,
            connector,
            service_credentials,
            allowlist: TeacherAllowlist::new(&config.oauth.allowed_teachers),
            temp_dir: PathBuf::from(&config.uploads.temp_dir),
            max_upload_bytes: config.uploads.max_upload_bytes(),
            page_size: config.drive.page_size,
            db,
        }
    }

    /// Drive client acting for a teacher, with a freshly refreshed token.
    pub async fn teacher_drive(&self, email: &str) -> Result<Arc<dyn DriveApi>, ApiError> {
        let token = self.refresher.access_token_for(email).await?;
        Ok(self.connector.connect(&token))
    }

    /// Drive client acting with the service credentials.
    ///
    /// `None` when no service credentials are configured.
    pub async fn service_drive(&self) -> Result<Option<Arc<dyn DriveApi>>, ApiError> {
        match &self.service_credentials {
            Some(credentials) => {
                let token = credentials.access_token().await?;
                Ok(Some(self.connector.connect(&token)))
            }
            None => Ok(None),
        }
    }
}
