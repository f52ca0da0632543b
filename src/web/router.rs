//! Router configuration.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{health_check, oauth, student, teacher};
use super::middleware::{
    create_cors_layer, login_rate_limit, security_headers, upload_rate_limit, RateLimitState,
};
use super::openapi::ApiDoc;
use super::state::AppState;
use crate::config::WebConfig;

/// Headroom for multipart framing and text fields on top of the file limit.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Create the API router.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = (app_state.max_upload_bytes + FORM_OVERHEAD_BYTES) as usize;
    let login_limits = rate_limits.clone();
    let upload_limits = rate_limits;

    let student_routes = Router::new()
        .route("/api/teachers", get(student::list_teachers))
        .route("/teacher-files", get(student::teacher_files))
        .route(
            "/upload",
            post(student::upload).layer(middleware::from_fn(move |req, next| {
                upload_rate_limit(upload_limits.clone(), req, next)
            })),
        );

    let auth_routes = Router::new()
        .route(
            "/login",
            get(oauth::login).layer(middleware::from_fn(move |req, next| {
                login_rate_limit(login_limits.clone(), req, next)
            })),
        )
        .route("/oauth2callback", get(oauth::callback))
        .route("/logout", get(oauth::logout));

    let teacher_routes = Router::new()
        .route("/", get(teacher::dashboard))
        .route("/dashboard", get(teacher::dashboard))
        .route("/api/folder/:id", get(teacher::folder_view))
        .route("/teacher-files", get(teacher::teacher_files))
        .route("/upload", post(teacher::upload))
        .route("/create-folder", post(teacher::create_folder))
        .route("/delete-item", post(teacher::delete_item));

    Router::new()
        .merge(student_routes)
        .nest("/teacher", auth_routes.merge(teacher_routes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}

pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Swagger UI at `/swagger-ui`, document at `/api-docs/openapi.json`.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

/// Static frontend, with `index.html` for unknown paths.
///
/// `None` when the directory does not exist.
pub fn create_static_router(static_path: &str) -> Option<Router> {
    let dir = Path::new(static_path);
    if !dir.is_dir() {
        tracing::warn!(path = %static_path, "Static directory not found, not serving frontend");
        return None;
    }

    let index = dir.join("index.html");
    let service = ServeDir::new(dir).fallback(ServeFile::new(index));
    Some(Router::new().fallback_service(service))
}

/// Complete application: API, health check, docs and optional frontend.
pub fn create_app(
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    config: &WebConfig,
) -> Router {
    let mut router = create_router(app_state, rate_limits, &config.cors_origins)
        .merge(create_health_router())
        .merge(create_swagger_router());

    if config.serve_static {
        if let Some(static_router) = create_static_router(&config.static_path) {
            router = router.merge(static_router);
        }
    }

    router
}
