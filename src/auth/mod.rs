//! Authentication module for classdrive.
//!
//! Teacher login through an OAuth identity provider, refresh credential
//! handling, the service account used for student uploads, the teacher
//! allow-list and server-side sessions.

mod oauth;
mod permission;
mod refresher;
mod service_account;
mod session;

pub use oauth::{GoogleIdentityProvider, IdentityProvider, TokenSet, UserInfo};
pub use permission::TeacherAllowlist;
pub use refresher::TokenRefresher;
pub use service_account::{ServiceAccount, ServiceAccountKey, ServiceCredentials, StaticToken};
pub use session::{SessionData, SessionStore, TeacherIdentity};

use std::fmt;

/// Short-lived bearer credential for the remote drive.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}
