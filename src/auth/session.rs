//! Server-side sessions.
//!
//! The browser only holds a random session id. State lives in the database
//! as [`SessionData`] and never contains tokens.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Database, SessionRepository};
use crate::config::MAX_SESSION_TTL_HOURS;
use crate::Result;

/// Logged-in teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherIdentity {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Typed session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub teacher: Option<TeacherIdentity>,
    /// Anti-forgery state of a login in progress.
    #[serde(default)]
    pub oauth_state: Option<String>,
    /// Where to go after login.
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// Database-backed session store.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(db: Database, ttl_hours: u64) -> Self {
        Self {
            db,
            ttl: Duration::hours(ttl_hours.min(MAX_SESSION_TTL_HOURS) as i64),
        }
    }

    /// Load a live session. Expired, unknown or unreadable sessions are `None`.
    pub async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let record = SessionRepository::new(self.db.pool())
            .get_valid(id, Utc::now().timestamp())
            .await?;

        Ok(record.and_then(|r| match serde_json::from_str(&r.data) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session");
                None
            }
        }))
    }

    /// Save session state under `id`, extending its lifetime.
    pub async fn save(&self, id: &str, data: &SessionData) -> Result<()> {
        let json = serde_json::to_string(data)
            .map_err(|e| crate::AppError::Database(format!("session encode failed: {e}")))?;
        let expires_at = (Utc::now() + self.ttl).timestamp();

        SessionRepository::new(self.db.pool())
            .upsert(id, &json, expires_at)
            .await
    }

    /// Store a new session and return its id.
    pub async fn create(&self, data: &SessionData) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.save(&id, data).await?;
        Ok(id)
    }

    pub async fn destroy(&self, id: &str) -> Result<()> {
        SessionRepository::new(self.db.pool()).delete(id).await?;
        Ok(())
    }

    /// Remove expired sessions. Returns how many were deleted.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        SessionRepository::new(self.db.pool())
            .cleanup_expired(Utc::now().timestamp())
            .await
    }
}
