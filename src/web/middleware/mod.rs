//! Middleware and request extractors for the web API.

pub mod cors;
pub mod rate_limit;
pub mod security;
pub mod session;

pub use cors::create_cors_layer;
pub use rate_limit::{login_rate_limit, upload_rate_limit, RateLimitState};
pub use security::security_headers;
pub use session::{is_local_redirect, CurrentSession, SessionCookie, TeacherSession};
