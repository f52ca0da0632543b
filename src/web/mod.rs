//! Web layer: routes, handlers and the HTTP server.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::{create_app, create_router};
pub use server::WebServer;
pub use state::AppState;
