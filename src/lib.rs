//! classdrive - class file exchange backed by Google Drive.
//!
//! Students submit assignments into a per-teacher upload folder. Teachers log
//! in with their Google account and manage a folder tree of course materials.

pub mod auth;
pub mod config;
pub mod db;
pub mod drive;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod upload;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{AppError, Result};
