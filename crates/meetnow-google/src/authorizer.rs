//! End-to-end authorization flow coordinator.
//!
//! One `Authorizer` drives one flow: try the token cache, otherwise
//! print the consent URL, wait (bounded) on the code relay, exchange the
//! code, persist the result. Terminal failures are never retried; a
//! fresh invocation always starts over at the cache check.

use tracing::{debug, info, warn};

use crate::config::GoogleConfig;
use crate::error::AuthResult;
use crate::oauth::OAuthClient;
use crate::relay::CodeReceiver;
use crate::tokens::{TokenCache, TokenInfo};

/// Coordinates the authorization-code flow for a single invocation.
#[derive(Debug)]
pub struct Authorizer {
    config: GoogleConfig,
    cache: TokenCache,
    oauth: OAuthClient,
}

impl Authorizer {
    /// Creates an authorizer from the given configuration.
    pub fn new(config: GoogleConfig) -> Self {
        let cache = TokenCache::new(&config.token_path);
        let oauth = OAuthClient::new(config.credentials.clone(), config.http_timeout);
        Self {
            config,
            cache,
            oauth,
        }
    }

    /// Replaces the OAuth client, keeping cache and config.
    pub fn with_oauth_client(mut self, oauth: OAuthClient) -> Self {
        self.oauth = oauth;
        self
    }

    /// Obtains a token, interactively if the cache cannot supply one.
    ///
    /// A cached token is returned as-is, without a freshness check;
    /// staleness surfaces downstream on the first authenticated call.
    /// The callback listener feeding `codes` is owned by the caller,
    /// which also owns shutting it down on every exit path.
    pub async fn authorize(&self, codes: &mut CodeReceiver) -> AuthResult<TokenInfo> {
        match self.cache.load() {
            Ok(token) => {
                info!(path = %self.cache.path().display(), "using cached token");
                return Ok(token);
            }
            Err(e) if e.is_cache_fallback() => {
                debug!("no usable cached token: {}", e);
            }
            Err(e) => return Err(e),
        }

        let redirect_uri = self.config.redirect_uri();
        let auth_url = self.oauth.auth_url(&self.config.scope, &redirect_uri);

        // The user needs the URL before any timeout fires, whatever
        // happens afterwards.
        println!("Visit the URL to authorize access:\n\n{}\n", auth_url);

        if self.config.open_browser
            && let Err(e) = open::that(&auth_url)
        {
            warn!("failed to open browser: {}", e);
        }

        let code = codes.recv_timeout(self.config.approval_timeout).await?;
        debug!("received authorization code from callback");

        let token = self.oauth.exchange_code(&code, &redirect_uri).await?;

        self.cache.store(&token)?;
        info!(path = %self.cache.path().display(), "token persisted");

        Ok(token)
    }
}
