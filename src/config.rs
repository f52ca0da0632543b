//! Configuration module for classdrive.

use serde::Deserialize;
use std::path::Path;

use crate::{AppError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve the frontend from `static_path`.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Rate limit for the login endpoint (requests per minute per client).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for the anonymous student upload (requests per minute per client).
    #[serde(default = "default_upload_rate_limit")]
    pub upload_rate_limit: u32,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

fn default_static_path() -> String {
    "public".to_string()
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_upload_rate_limit() -> u32 {
    20
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            serve_static: false,
            static_path: default_static_path(),
            login_rate_limit: default_login_rate_limit(),
            upload_rate_limit: default_upload_rate_limit(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Whether the cookie carries the `Secure` attribute.
    #[serde(default = "default_cookie_secure")]
    pub secure: bool,
    /// Session lifetime in hours.
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: u64,
}

fn default_cookie_name() -> String {
    "classdrive_session".to_string()
}

fn default_cookie_secure() -> bool {
    true
}

/// Upper bound for `session.ttl_hours` (one year).
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

fn default_session_ttl() -> u64 {
    24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure: default_cookie_secure(),
            ttl_hours: default_session_ttl(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/classdrive.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Upload intake configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadsConfig {
    /// Directory where incoming files are spooled before they go to the drive.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_temp_dir() -> String {
    "data/uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    10
}

impl UploadsConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Teacher login (OAuth 2.0 authorization code flow).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// OAuth client id.
    #[serde(default)]
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Callback URL registered with the provider.
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    /// Scopes requested at login.
    #[serde(default = "default_oauth_scopes")]
    pub scopes: Vec<String>,
    /// Emails allowed to use the teacher area.
    #[serde(default)]
    pub allowed_teachers: Vec<String>,
}

fn default_redirect_url() -> String {
    "http://localhost:3000/teacher/oauth2callback".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
}

fn default_oauth_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
        "https://www.googleapis.com/auth/drive.file".to_string(),
    ]
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: default_redirect_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            scopes: default_oauth_scopes(),
            allowed_teachers: vec![],
        }
    }
}

/// Service account used for the student side, which has no login.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountConfig {
    /// Path to a JSON key file. Empty disables the student drive.
    #[serde(default)]
    pub key_path: String,
    /// Inline JSON key, takes precedence over `key_path`.
    #[serde(default)]
    pub key_json: String,
    #[serde(default = "default_service_scopes")]
    pub scopes: Vec<String>,
}

fn default_service_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/drive".to_string()]
}

impl ServiceAccountConfig {
    /// Whether any key source is configured.
    pub fn is_configured(&self) -> bool {
        !self.key_json.is_empty() || !self.key_path.is_empty()
    }
}

impl Default for ServiceAccountConfig {
    fn default() -> Self {
        Self {
            key_path: String::new(),
            key_json: String::new(),
            scopes: default_service_scopes(),
        }
    }
}

/// Remote drive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// `google` for Drive v3, `memory` for a process-local drive (development).
    #[serde(default = "default_drive_backend")]
    pub backend: String,
    #[serde(default = "default_drive_api_base")]
    pub api_base: String,
    #[serde(default = "default_drive_upload_base")]
    pub upload_base: String,
    /// Number of children fetched per folder listing.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_drive_backend() -> String {
    "google".to_string()
}

fn default_drive_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_drive_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_page_size() -> u32 {
    10
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            backend: default_drive_backend(),
            api_base: default_drive_api_base(),
            upload_base: default_drive_upload_base(),
            page_size: default_page_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/classdrive.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub service_account: ServiceAccountConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Read a non-empty environment variable.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Split a comma separated list, dropping blanks.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(AppError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AppError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CLASSDRIVE_OAUTH_CLIENT_ID`
    /// - `CLASSDRIVE_OAUTH_CLIENT_SECRET`
    /// - `CLASSDRIVE_ALLOWED_TEACHERS`: comma separated emails
    /// - `CLASSDRIVE_SERVICE_ACCOUNT_JSON`: inline service account key
    /// - `CLASSDRIVE_SESSION_SECURE`: `true` or `false`
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_value("CLASSDRIVE_OAUTH_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Some(v) = env_value("CLASSDRIVE_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = v;
        }
        if let Some(v) = env_value("CLASSDRIVE_ALLOWED_TEACHERS") {
            self.oauth.allowed_teachers = split_list(&v);
        }
        if let Some(v) = env_value("CLASSDRIVE_SERVICE_ACCOUNT_JSON") {
            self.service_account.key_json = v;
        }
        if let Some(v) = env_value("CLASSDRIVE_SESSION_SECURE") {
            match v.parse::<bool>() {
                Ok(secure) => self.session.secure = secure,
                Err(_) => tracing::warn!(value = %v, "Ignoring invalid CLASSDRIVE_SESSION_SECURE"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match self.drive.backend.as_str() {
            "google" => {
                if self.oauth.client_id.is_empty() || self.oauth.client_secret.is_empty() {
                    return Err(AppError::Config(
                        "oauth client_id and client_secret must be set for the google backend. \
                         Set them in config.toml or via CLASSDRIVE_OAUTH_CLIENT_ID / \
                         CLASSDRIVE_OAUTH_CLIENT_SECRET."
                            .to_string(),
                    ));
                }
            }
            "memory" => {}
            other => {
                return Err(AppError::Config(format!(
                    "unknown drive backend '{other}' (expected google or memory)"
                )));
            }
        }

        if !(1..=1000).contains(&self.drive.page_size) {
            return Err(AppError::Config(
                "drive.page_size must be between 1 and 1000".to_string(),
            ));
        }
        if self.uploads.max_upload_size_mb == 0 {
            return Err(AppError::Config(
                "uploads.max_upload_size_mb must be greater than 0".to_string(),
            ));
        }
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session.ttl_hours) {
            return Err(AppError::Config(format!(
                "session.ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 3000);
        assert!(!config.web.serve_static);
        assert_eq!(config.session.cookie_name, "classdrive_session");
        assert!(config.session.secure);
        assert_eq!(config.session.ttl_hours, 24);
        assert_eq!(config.database.path, "data/classdrive.db");
        assert_eq!(config.uploads.max_upload_size_mb, 10);
        assert_eq!(config.uploads.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.drive.backend, "google");
        assert_eq!(config.drive.page_size, 10);
        assert_eq!(config.oauth.scopes.len(), 2);
        assert!(config.oauth.allowed_teachers.is_empty());
        assert!(!config.service_account.is_configured());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[web]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:5173"]
serve_static = true
static_path = "frontend"

[session]
cookie_name = "sid"
secure = false
ttl_hours = 8

[database]
path = "/var/lib/classdrive.db"

[uploads]
temp_dir = "/tmp/classdrive"
max_upload_size_mb = 25

[oauth]
client_id = "id"
client_secret = "secret"
redirect_url = "https://school.example/teacher/oauth2callback"
allowed_teachers = ["ana@school.example", "ben@school.example"]

[service_account]
key_path = "/etc/classdrive/sa.json"

[drive]
backend = "memory"
page_size = 50

[logging]
level = "debug"
file = "/var/log/classdrive.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert!(config.web.serve_static);
        assert_eq!(config.session.cookie_name, "sid");
        assert!(!config.session.secure);
        assert_eq!(config.session.ttl_hours, 8);
        assert_eq!(config.uploads.temp_dir, "/tmp/classdrive");
        assert_eq!(config.uploads.max_upload_size_mb, 25);
        assert_eq!(config.oauth.client_id, "id");
        assert_eq!(config.oauth.allowed_teachers.len(), 2);
        assert_eq!(config.oauth.token_url, "https://oauth2.googleapis.com/token");
        assert!(config.service_account.is_configured());
        assert_eq!(config.drive.backend, "memory");
        assert_eq!(config.drive.page_size, 50);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[web]
port = 9000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.drive.page_size, 10);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.database.path, "data/classdrive.db");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[web]\nport = \"not a number\"");

        if let Err(AppError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" a@x.org , ,b@x.org,"),
            vec!["a@x.org".to_string(), "b@x.org".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    // Every env var test lives in this one function so parallel tests never race.
    #[test]
    fn test_apply_env_overrides() {
        let names = [
            "CLASSDRIVE_OAUTH_CLIENT_ID",
            "CLASSDRIVE_ALLOWED_TEACHERS",
            "CLASSDRIVE_SESSION_SECURE",
        ];
        let originals: Vec<Option<String>> =
            names.iter().map(|n| std::env::var(n).ok()).collect();

        std::env::set_var("CLASSDRIVE_OAUTH_CLIENT_ID", "env-client");
        std::env::set_var("CLASSDRIVE_ALLOWED_TEACHERS", "ana@school.example, ben@school.example");
        std::env::set_var("CLASSDRIVE_SESSION_SECURE", "false");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.oauth.client_id, "env-client");
        assert_eq!(
            config.oauth.allowed_teachers,
            vec!["ana@school.example", "ben@school.example"]
        );
        assert!(!config.session.secure);

        // Empty values do not override.
        std::env::set_var("CLASSDRIVE_OAUTH_CLIENT_ID", "");
        let mut config = Config::default();
        config.oauth.client_id = "from-file".to_string();
        config.apply_env_overrides();
        assert_eq!(config.oauth.client_id, "from-file");

        for (name, original) in names.iter().zip(originals) {
            match original {
                Some(val) => std::env::set_var(name, val),
                None => std::env::remove_var(name),
            }
        }
    }

    #[test]
    fn test_validate_google_requires_client() {
        let config = Config::default();
        let result = config.validate();
        if let Err(AppError::Config(msg)) = result {
            assert!(msg.contains("client_id"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_validate_google_with_client() {
        let mut config = Config::default();
        config.oauth.client_id = "id".to_string();
        config.oauth.client_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_memory_backend() {
        let mut config = Config::default();
        config.drive.backend = "memory".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.drive.backend = "dropbox".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.drive.backend = "memory".to_string();
        config.drive.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.drive.backend = "memory".to_string();
        config.uploads.max_upload_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_session_ttl_bounds() {
        let mut config = Config::default();
        config.drive.backend = "memory".to_string();

        config.session.ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());

        config.session.ttl_hours = 0;
        assert!(config.validate().is_err());

        config.session.ttl_hours = u64::MAX;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
