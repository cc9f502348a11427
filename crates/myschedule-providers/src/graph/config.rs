//! Microsoft Graph provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// OAuth 2.0 application registration for Microsoft identity platform.
///
/// Public (desktop) registrations only have a client ID. Confidential
/// registrations also carry a client secret.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The application (client) ID from the Azure app registration.
    pub client_id: String,
    /// The client secret, for confidential registrations.
    pub client_secret: Option<String>,
}

impl OAuthCredentials {
    /// Creates credentials for a public client.
    pub fn public(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
        }
    }

    /// Creates credentials for a confidential client.
    pub fn confidential(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
        }
    }

    /// Validates that the credentials appear to be correctly formatted.
    ///
    /// Application IDs are GUIDs: 32 hex digits in 8-4-4-4-12 groups.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !looks_like_guid(&self.client_id) {
            return Err("client_id should be a GUID like 00000000-0000-0000-0000-000000000000");
        }
        if self.client_secret.as_deref() == Some("") {
            return Err("client_secret must not be empty when set");
        }
        Ok(())
    }
}

fn looks_like_guid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Configuration for the Microsoft Graph provider.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Directory tenant: `common`, `organizations`, `consumers`, a tenant
    /// GUID or a verified domain.
    pub tenant: String,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `~/.local/share/myschedule/graph-tokens.json`.
    pub token_path: PathBuf,

    /// Identity platform root, without a trailing slash.
    pub authority: String,

    /// Graph API root, without a trailing slash.
    pub api_base: String,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    ///
    /// Defaults to (8400, 8410).
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Zone Graph should report start times in, sent as
    /// `Prefer: outlook.timezone="..."`.
    ///
    /// When unset Graph answers in UTC. Either way the zone travels with
    /// each event, so this only changes how times look on the wire.
    pub prefer_timezone: Option<String>,
}

impl GraphConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_TENANT: &'static str = "common";

    pub const DEFAULT_AUTHORITY: &'static str = "https://login.microsoftonline.com";

    pub const DEFAULT_API_BASE: &'static str = "https://graph.microsoft.com/v1.0";

    /// Scopes for reading the calendar and the signed-in address, plus a
    /// refresh token.
    pub const DEFAULT_SCOPES: &'static [&'static str] =
        &["offline_access", "User.Read", "Calendars.Read"];

    /// Creates a new configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            tenant: Self::DEFAULT_TENANT.to_string(),
            token_path: Self::default_token_path(),
            authority: Self::DEFAULT_AUTHORITY.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("myschedule/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8400, 8410),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            prefer_timezone: None,
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".local").join("share"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("myschedule")
            .join("graph-tokens.json")
    }

    /// Sets the tenant.
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl AsRef<Path>) -> Self {
        self.token_path = path.as_ref().to_path_buf();
        self
    }

    /// Sets the identity platform root.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the Graph API root.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the preferred response zone.
    pub fn with_prefer_timezone(mut self, zone: impl Into<String>) -> Self {
        self.prefer_timezone = Some(zone.into());
        self
    }

    /// Returns the authorization endpoint for the configured tenant.
    pub fn authorize_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/authorize", self.authority, self.tenant)
    }

    /// Returns the token endpoint for the configured tenant.
    pub fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.tenant.trim().is_empty() {
            return Err("tenant must not be empty".to_string());
        }

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_ID: &str = "0a1b2c3d-4e5f-6789-abcd-ef0123456789";

    #[test]
    fn credentials_validation() {
        assert!(OAuthCredentials::public(CLIENT_ID).validate().is_ok());
        assert!(
            OAuthCredentials::confidential(CLIENT_ID, "s3cr3t")
                .validate()
                .is_ok()
        );

        assert!(OAuthCredentials::public("").validate().is_err());
        assert!(OAuthCredentials::public("not-a-guid").validate().is_err());
        assert!(
            OAuthCredentials::public("0a1b2c3d-4e5f-6789-abcd-ef012345678z")
                .validate()
                .is_err()
        );
        assert!(
            OAuthCredentials::confidential(CLIENT_ID, "")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn config_defaults() {
        let config = GraphConfig::new(OAuthCredentials::public(CLIENT_ID));
        assert_eq!(config.tenant, "common");
        assert_eq!(
            config.scopes,
            vec!["offline_access", "User.Read", "Calendars.Read"]
        );
        assert!(config.prefer_timezone.is_none());
        assert!(config.token_path.ends_with("myschedule/graph-tokens.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn endpoints_follow_tenant() {
        let config =
            GraphConfig::new(OAuthCredentials::public(CLIENT_ID)).with_tenant("contoso.com");
        assert_eq!(
            config.authorize_url(),
            "https://login.microsoftonline.com/contoso.com/oauth2/v2.0/authorize"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn config_validation() {
        let no_scopes = GraphConfig::new(OAuthCredentials::public(CLIENT_ID)).with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let bad_ports = GraphConfig::new(OAuthCredentials::public(CLIENT_ID))
            .with_loopback_port_range(9000, 8000);
        assert!(bad_ports.validate().is_err());

        let no_tenant = GraphConfig::new(OAuthCredentials::public(CLIENT_ID)).with_tenant(" ");
        assert!(no_tenant.validate().is_err());
    }

    #[test]
    fn config_builder_methods() {
        let config = GraphConfig::new(OAuthCredentials::public(CLIENT_ID))
            .with_token_path("/tmp/tokens.json")
            .with_timeout(Duration::from_secs(5))
            .with_prefer_timezone("Europe/Berlin")
            .with_api_base("http://127.0.0.1:9000/v1.0/");

        assert_eq!(config.token_path, PathBuf::from("/tmp/tokens.json"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.prefer_timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(config.api_base, "http://127.0.0.1:9000/v1.0");
    }
}
