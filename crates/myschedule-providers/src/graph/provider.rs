//! Microsoft Graph provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait on top of the
//! Graph calendar view.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, FetchDay};
use crate::raw_event::RawEvent;

use super::client::GraphClient;
use super::config::GraphConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

const NOT_AUTHENTICATED: &str = "not authenticated, run 'myschedule logon'";

/// Microsoft Graph calendar provider.
pub struct GraphProvider {
    config: GraphConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: GraphClient,
    /// Serializes token refreshes so a rotated refresh token is used once.
    refresh_lock: Mutex<()>,
}

impl GraphProvider {
    /// Creates a new provider with the given configuration.
    ///
    /// This loads any existing tokens from storage but does not start a
    /// sign-in. Call [`authenticate`](Self::authenticate) if needed.
    pub fn new(config: GraphConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let token_storage = TokenStorage::new(&config.token_path);
        // A broken token file means signing in again, not a broken provider.
        if let Err(e) = token_storage.load() {
            warn!("ignoring stored tokens: {}", e);
        }

        let oauth_client = OAuthClient::new(config.clone())?;
        let api_client = GraphClient::new(&config)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Runs the interactive sign-in and stores the tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Microsoft sign-in");
        let tokens = self.oauth_client.authorize().await?;
        self.token_storage.set(tokens)?;
        info!("authentication successful");
        Ok(())
    }

    /// Forgets the stored session.
    pub fn logout(&self) -> ProviderResult<()> {
        self.token_storage.clear()
    }

    /// Checks if re-authentication is needed (e.g., scope changes).
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    /// Returns where the session is stored.
    pub fn token_path(&self) -> &std::path::Path {
        self.token_storage.path()
    }

    /// Returns the email address of the signed-in user.
    pub async fn signed_in_address(&self) -> ProviderResult<String> {
        let token = self.access_token().await?;
        let profile = self.api_client.me(&token).await?;
        profile.address().map(str::to_string).ok_or_else(|| {
            ProviderError::invalid_response("signed-in user has no email address")
        })
    }

    /// Returns a usable access token, refreshing it first if it expired.
    async fn access_token(&self) -> ProviderResult<String> {
        if let Some(tokens) = self.token_storage.get()
            && !tokens.is_expired()
        {
            return Ok(tokens.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited.
        let tokens = self
            .token_storage
            .get()
            .ok_or_else(|| ProviderError::authentication(NOT_AUTHENTICATED))?;
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication("session expired, run 'myschedule logon'")
        })?;

        debug!("refreshing expired access token");
        let refreshed = self.oauth_client.refresh_token(refresh_token).await?;
        let access_token = refreshed.access_token.clone();
        self.token_storage.apply_refresh(refreshed)?;
        Ok(access_token)
    }

    async fn fetch_day_impl(&self, day: FetchDay) -> ProviderResult<Vec<RawEvent>> {
        let token = self.access_token().await?;
        debug!(
            "fetching calendar view for {} ({} to {})",
            day.date, day.window.start, day.window.end
        );
        self.api_client.calendar_view(&token, &day.window).await
    }
}

impl CalendarProvider for GraphProvider {
    fn name(&self) -> &str {
        "graph"
    }

    /// A session exists when there is an unexpired access token or a
    /// refresh token, and it covers the configured scopes.
    fn is_authenticated(&self) -> bool {
        (self.token_storage.has_valid_tokens() || self.token_storage.has_refresh_token())
            && !self.needs_reauth()
    }

    fn fetch_day(&self, day: FetchDay) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            self.fetch_day_impl(day)
                .await
                .map_err(|e| e.with_provider("graph"))
        })
    }
}

impl std::fmt::Debug for GraphProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphProvider")
            .field("tenant", &self.config.tenant)
            .field("token_path", &self.token_storage.path())
            .finish_non_exhaustive()
    }
}
