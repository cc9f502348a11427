//! OAuth token storage.
//!
//! Tokens live in a single JSON file, written atomically and readable only
//! by the owner.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::oauth::RefreshedToken;

/// Access tokens are treated as expired this long before they really are.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Prefix Microsoft puts in front of Graph scopes in token responses.
const GRAPH_RESOURCE: &str = "https://graph.microsoft.com/";

/// Scopes that are granted without being echoed back.
const IMPLICIT_SCOPES: &[&str] = &["offline_access", "openid", "profile"];

/// Information about an OAuth token set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,

    pub refresh_token: Option<String>,

    /// When the access token stops being usable, buffer included.
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// When the tokens were last refreshed.
    pub last_refresh: DateTime<Utc>,
}

fn expiry(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS))
}

fn normalize_scope(scope: &str) -> String {
    scope
        .strip_prefix(GRAPH_RESOURCE)
        .unwrap_or(scope)
        .to_ascii_lowercase()
}

impl TokenInfo {
    /// Creates a new token info from token endpoint data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    /// Returns true if every required scope was granted.
    ///
    /// Scopes compare case-insensitively and with or without the Graph
    /// resource prefix. `offline_access` and the OpenID scopes are never
    /// echoed back and are assumed granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        let granted: Vec<String> = self.scopes.iter().map(|s| normalize_scope(s)).collect();
        required
            .iter()
            .map(|s| normalize_scope(s))
            .filter(|s| !IMPLICIT_SCOPES.contains(&s.as_str()))
            .all(|s| granted.contains(&s))
    }

    /// Applies the result of a refresh.
    ///
    /// A rotated refresh token replaces the stored one.
    pub fn apply_refresh(&mut self, refreshed: RefreshedToken) {
        self.access_token = refreshed.access_token;
        if let Some(refresh_token) = refreshed.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.expires_at = expiry(refreshed.expires_in);
        self.last_refresh = Utc::now();
    }
}

/// File-backed token storage with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    /// Creates a new token storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<TokenInfo>> {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<TokenInfo>> {
        self.tokens.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads tokens from disk into memory.
    ///
    /// Returns Ok(true) if tokens were loaded, Ok(false) if no tokens exist.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("loaded tokens from {:?}", self.path);
        *self.write() = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        // Write next to the target, then rename over it.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns a clone of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.read().clone()
    }

    /// Sets new tokens and saves them to disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.save(&tokens)?;
        *self.write() = Some(tokens);
        Ok(())
    }

    /// Applies a refresh and saves to disk.
    pub fn apply_refresh(&self, refreshed: RefreshedToken) -> ProviderResult<()> {
        let mut tokens = self
            .get()
            .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        tokens.apply_refresh(refreshed);
        self.set(tokens)
    }

    /// Clears the stored tokens, in memory and on disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.write() = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!("removed tokens from {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if tokens are loaded and not expired.
    pub fn has_valid_tokens(&self) -> bool {
        self.read().as_ref().is_some_and(|t| !t.is_expired())
    }

    /// Returns true if tokens are loaded and have a refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|t| t.refresh_token.is_some())
    }

    /// Returns true if the user has to log on again: no tokens, or tokens
    /// missing one of `required_scopes`.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        match self.read().as_ref() {
            None => true,
            Some(tokens) => !tokens.has_scopes(required_scopes),
        }
    }
}
