//! Provider credentials and flow configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// OAuth 2.0 credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports the Google Cloud Console format with an "installed" or "web"
/// section, and the flat format with client_id/client_secret at root level.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::config(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| AuthError::config(format!("failed to parse credentials JSON: {}", e)))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(AuthError::config(
            "credentials file must contain an 'installed'/'web' section \
             or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the authorization flow and the calendar client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth credentials for API access.
    pub credentials: Credentials,

    /// Local port for the OAuth callback listener.
    pub callback_port: u16,

    /// How long to wait for the user to approve the consent screen.
    pub approval_timeout: Duration,

    /// Request timeout for token-exchange and calendar HTTP calls.
    pub http_timeout: Duration,

    /// OAuth scope to request.
    pub scope: String,

    /// Path to the token cache file.
    pub token_path: PathBuf,

    /// Time zone sent in event bodies.
    pub time_zone: String,

    /// Whether to open the consent URL in the default browser.
    ///
    /// The URL is printed to the terminal regardless.
    pub open_browser: bool,
}

impl GoogleConfig {
    /// Default local callback port.
    pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

    /// Default approval timeout in seconds.
    pub const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 30;

    /// Default HTTP timeout in seconds.
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    /// Default OAuth scope for calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration with the given credentials and defaults
    /// for everything else.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            callback_port: Self::DEFAULT_CALLBACK_PORT,
            approval_timeout: Duration::from_secs(Self::DEFAULT_APPROVAL_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(Self::DEFAULT_HTTP_TIMEOUT_SECS),
            scope: Self::DEFAULT_SCOPE.to_string(),
            token_path: Self::default_token_path(),
            time_zone: "UTC".to_string(),
            open_browser: true,
        }
    }

    /// Returns the default token cache path
    /// (`~/.local/share/meetnow/token.json`).
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetnow")
            .join("token.json")
    }

    /// Returns the default credentials path
    /// (`~/.config/meetnow/credentials.json`).
    pub fn default_credentials_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetnow")
            .join("credentials.json")
    }

    /// Returns the redirect URI the provider sends the browser back to.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/auth", self.callback_port)
    }

    /// Sets the callback port.
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    /// Sets the approval timeout.
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }

    /// Sets the HTTP request timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Sets the OAuth scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the token cache path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the time zone for event bodies.
    pub fn with_time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = tz.into();
        self
    }

    /// Sets whether the consent URL is opened in the browser.
    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AuthResult<()> {
        self.credentials
            .validate()
            .map_err(|e| AuthError::config(format!("invalid credentials: {}", e)))?;

        if self.scope.is_empty() {
            return Err(AuthError::config("an OAuth scope is required"));
        }

        if self.callback_port == 0 {
            return Err(AuthError::config("callback port must be fixed, not 0"));
        }

        Ok(())
    }
}
