//! Web server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::auth::SessionStore;
use crate::config::WebConfig;
use crate::{AppError, Result};

use super::middleware::RateLimitState;
use super::router::create_app;
use super::state::AppState;

/// Expired sessions are purged this often.
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

fn listen_addr(config: &WebConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid web address: {e}")))
}

pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    web_config: WebConfig,
}

impl WebServer {
    /// Fails if `host:port` is not a valid socket address.
    pub fn new(config: &WebConfig, app_state: Arc<AppState>) -> Result<Self> {
        Ok(Self {
            addr: listen_addr(config)?,
            app_state,
            web_config: config.clone(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Hourly removal of expired sessions. The first run is one interval in.
    fn start_session_cleanup_task(sessions: SessionStore) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));
            interval.tick().await;

            loop {
                interval.tick().await;

                match sessions.cleanup_expired().await {
                    Ok(0) => tracing::debug!("No expired sessions to clean up"),
                    Ok(count) => tracing::info!(deleted_count = count, "Cleaned up expired sessions"),
                    Err(e) => tracing::warn!(error = %e, "Failed to clean up sessions"),
                }
            }
        });
    }

    fn build(&self) -> Router {
        let rate_limits = Arc::new(RateLimitState::new(
            self.web_config.login_rate_limit,
            self.web_config.upload_rate_limit,
        ));
        rate_limits.clone().start_cleanup_task();

        create_app(self.app_state.clone(), rate_limits, &self.web_config)
            .layer(CompressionLayer::new())
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, Router)> {
        let router = self.build();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_session_cleanup_task(self.app_state.sessions.clone());
        tracing::info!("Web server listening on http://{}", local_addr);

        Ok((listener, router))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    /// Serve in the background and return the bound address.
    ///
    /// Binding to port 0 picks a free port.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
