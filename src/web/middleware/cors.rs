//! CORS configuration.

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// CORS layer for the configured origins.
///
/// Listed origins may send the session cookie. With no valid origins any
/// origin may call the API, without credentials.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed_origins.is_empty() {
        if !origins.is_empty() {
            tracing::warn!(?origins, "No valid CORS origins, allowing any origin without credentials");
        }
        return CorsLayer::new()
            .allow_methods(METHODS)
            .allow_headers(Any)
            .allow_origin(Any);
    }

    CorsLayer::new()
        .allow_methods(METHODS)
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
        .allow_origin(parsed_origins)
}
