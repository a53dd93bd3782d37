//! Consent-URL construction and authorization-code exchange.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::config::Credentials;
use crate::error::{AuthError, AuthResult};
use crate::tokens::TokenInfo;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Fixed state parameter sent with the consent URL.
///
/// Structural only: the flow runs against a single-user loopback
/// redirect, so this is not a CSRF nonce.
const STATE_TOKEN: &str = "state-token";

/// Client for the provider's authorization and token endpoints.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: Credentials,
    http_client: reqwest::Client,
    auth_endpoint: String,
    token_endpoint: String,
}

impl OAuthClient {
    /// Creates a client with the given credentials and request timeout.
    pub fn new(credentials: Credentials, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            credentials,
            http_client,
            auth_endpoint: GOOGLE_AUTH_URL.to_string(),
            token_endpoint: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Overrides the authorization endpoint.
    pub fn with_auth_endpoint(mut self, url: impl Into<String>) -> Self {
        self.auth_endpoint = url.into();
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.token_endpoint = url.into();
        self
    }

    /// Builds the consent URL the user must visit.
    ///
    /// Requests offline access so the provider issues a refresh token
    /// alongside the access token.
    pub fn auth_url(&self, scope: &str, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&\
            access_type=offline&prompt=consent",
            self.auth_endpoint,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(STATE_TOKEN),
        )
    }

    /// Exchanges an authorization code for a token.
    ///
    /// Single attempt: a rejection by the provider and a transport
    /// failure both surface as [`AuthError::Exchange`].
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AuthResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::exchange(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::exchange(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(AuthError::exchange(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::exchange(format!("invalid token response: {}", e)))?;

        info!("obtained access token");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            token_response.token_type,
        ))
    }
}

/// Response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}
