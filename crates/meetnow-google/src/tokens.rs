//! Token persistence.
//!
//! A single token record lives at a fixed path. A fresh authorization
//! fully replaces the stored record; nothing is ever updated in place.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// A bearer token set issued by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token, when offline access was granted.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// When the access token expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// The token type, usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenInfo {
    /// Creates a token record from token-endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        token_type: Option<String>,
    ) -> Self {
        let expires_at = expires_in_secs.map(|secs| {
            // Subtract a margin so the recorded expiry errs on the early side
            Utc::now() + Duration::seconds(secs) - Duration::seconds(60)
        });

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            token_type,
        }
    }

    /// Returns true if the access token is past its recorded expiry.
    ///
    /// The authorization flow itself never consults this; a stale token
    /// surfaces as a 401 on the downstream calendar call.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }
}

/// File-backed cache holding one serialized token.
#[derive(Debug)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Creates a cache over the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored token.
    ///
    /// Fails with [`AuthError::CacheMiss`] when the file is missing,
    /// unreadable, or empty, and [`AuthError::CacheCorrupt`] when its
    /// content cannot be deserialized.
    pub fn load(&self) -> AuthResult<TokenInfo> {
        if !self.path.exists() {
            return Err(AuthError::CacheMiss(format!(
                "no token file at {}",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| AuthError::CacheMiss(format!("failed to read token file: {}", e)))?;

        if content.trim().is_empty() {
            return Err(AuthError::CacheMiss(format!(
                "token file {} is empty",
                self.path.display()
            )));
        }

        let token: TokenInfo = serde_json::from_str(&content)
            .map_err(|e| AuthError::CacheCorrupt(format!("failed to parse token file: {}", e)))?;

        debug!(path = %self.path.display(), "loaded cached token");
        Ok(token)
    }

    /// Writes the token, fully replacing any previous record.
    ///
    /// The content goes to a temp file first and is renamed into place,
    /// so a concurrent reader never sees a torn token.
    pub fn store(&self, token: &TokenInfo) -> AuthResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::CacheWrite(format!("failed to create token directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(token)
            .map_err(|e| AuthError::CacheWrite(format!("failed to serialize token: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .map_err(|e| AuthError::CacheWrite(format!("failed to write token file: {}", e)))?;

        // The token is a bearer credential: owner-only before it lands
        // at the final path.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                AuthError::CacheWrite(format!("failed to set token file permissions: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| AuthError::CacheWrite(format!("failed to rename token file: {}", e)))?;

        debug!(path = %self.path.display(), "stored token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_token() -> TokenInfo {
        TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            Some("Bearer".to_string()),
        )
    }

    #[test]
    fn token_info_expiry_margin() {
        let token = test_token();
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());

        let mut stale = test_token();
        stale.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(stale.is_expired());

        let no_expiry = TokenInfo::new("access", None, None, None);
        assert!(!no_expiry.is_expired());
    }

    #[test]
    fn store_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path().join("token.json"));

        let token = test_token();
        cache.store(&token).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded, token);
    }

    #[test]
    fn load_missing_file_is_cache_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path().join("token.json"));
        assert!(matches!(cache.load(), Err(AuthError::CacheMiss(_))));
    }

    #[test]
    fn load_empty_file_is_cache_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("token.json");
        fs::write(&path, "").unwrap();

        let cache = TokenCache::new(path);
        assert!(matches!(cache.load(), Err(AuthError::CacheMiss(_))));
    }

    #[test]
    fn load_garbage_is_cache_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("token.json");
        fs::write(&path, "{ not a token").unwrap();

        let cache = TokenCache::new(path);
        assert!(matches!(cache.load(), Err(AuthError::CacheCorrupt(_))));
    }

    #[test]
    fn store_replaces_previous_token() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path().join("token.json"));

        cache.store(&test_token()).unwrap();

        let replacement = TokenInfo::new("new-access", None, None, None);
        cache.store(&replacement).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.access_token, "new-access");
        assert!(loaded.refresh_token.is_none());
    }

    #[test]
    fn store_creates_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(tmp.path().join("nested").join("dir").join("token.json"));
        cache.store(&test_token()).unwrap();
        assert!(cache.load().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("token.json");
        let cache = TokenCache::new(&path);
        cache.store(&test_token()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn store_fails_when_parent_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let cache = TokenCache::new(blocker.join("token.json"));
        assert!(matches!(
            cache.store(&test_token()),
            Err(AuthError::CacheWrite(_))
        ));
    }
}
