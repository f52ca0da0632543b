//! OAuth 2.0 identity provider for teacher login.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use reqwest::header;
use serde::Deserialize;

use super::AccessToken;
use crate::config::OAuthConfig;
use crate::{AppError, Result};

/// Tokens returned by an authorization code exchange.
#[derive(Clone)]
pub struct TokenSet {
    pub access_token: AccessToken,
    /// Present when offline access was granted.
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &self.access_token)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Third-party login.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization URL and the anti-forgery state embedded in it.
    fn authorization_url(&self) -> (String, String);

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet>;

    /// Get a fresh access token.
    ///
    /// A rejected refresh token yields [`AppError::ReauthenticationRequired`];
    /// failing to reach the provider yields [`AppError::Provider`].
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken>;

    /// Profile of the user owning `token`.
    async fn user_info(&self, token: &AccessToken) -> Result<UserInfo>;
}

/// Google as identity provider.
pub struct GoogleIdentityProvider {
    client: BasicClient,
    scopes: Vec<String>,
    userinfo_url: String,
    http: reqwest::Client,
}

impl GoogleIdentityProvider {
    pub fn new(config: &OAuthConfig, http: reqwest::Client) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.auth_url.clone())
                .map_err(|e| AppError::Config(format!("invalid auth URL: {e}")))?,
            Some(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| AppError::Config(format!("invalid token URL: {e}")))?,
            ),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_url.clone())
                .map_err(|e| AppError::Config(format!("invalid redirect URL: {e}")))?,
        );

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
            userinfo_url: config.userinfo_url.clone(),
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self) -> (String, String) {
        let (url, state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        (url.to_string(), state.secret().clone())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(r) => {
                    AppError::Auth(format!("authorization code rejected: {}", r.error()))
                }
                other => AppError::Provider(format!("token exchange failed: {other}")),
            })?;

        Ok(TokenSet {
            access_token: AccessToken::new(token.access_token().secret().clone()),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_in: token.expires_in(),
        })
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<AccessToken> {
        let token = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(r) => AppError::ReauthenticationRequired(
                    format!("refresh token rejected: {}", r.error()),
                ),
                other => AppError::Provider(format!("token refresh failed: {other}")),
            })?;

        Ok(AccessToken::new(token.access_token().secret().clone()))
    }

    async fn user_info(&self, token: &AccessToken) -> Result<UserInfo> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.secret()))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("invalid userinfo response: {e}")))
    }
}
