//! HTTP handlers.

pub mod form;
pub mod oauth;
pub mod student;
pub mod teacher;

/// GET /health - Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}
