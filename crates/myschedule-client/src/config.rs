//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/myschedule/config.toml` by default:
//!
//! ```toml
//! [graph]
//! client_id = "0a1b2c3d-4e5f-6789-abcd-ef0123456789"
//! client_secret = "pass::azure/myschedule"   # optional
//! tenant = "contoso.com"                     # default: common
//!
//! [schedule]
//! self_email = "me@contoso.com"              # default: the signed-in address
//! noise_subjects = ["Fokuszeit", "Block", "Mittagessen", "Date Night"]
//! broadcast_threshold = 20
//! distribution_list_prefix = "DL "
//! on_malformed = "skip"                      # or "abort"
//! ```
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store`, resolved via `pass show`
//! - `env::VAR_NAME`, resolved from the environment
//! - plain text, used as-is

use std::path::{Path, PathBuf};

use myschedule_core::ScheduleRules;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the myschedule client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Microsoft Graph settings.
    #[cfg(feature = "graph")]
    pub graph: Option<GraphSettings>,

    /// Normalization rules.
    pub schedule: ScheduleRules,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("myschedule")
            .join("config.toml")
    }
}

/// Microsoft Graph settings.
///
/// Credentials are stored inline and support secret references.
#[cfg(feature = "graph")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Application (client) ID.
    pub client_id: Option<String>,

    /// Client secret, for confidential app registrations.
    pub client_secret: Option<String>,

    /// Directory tenant (`common` when unset).
    pub tenant: Option<String>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Zone name sent as `Prefer: outlook.timezone`.
    pub prefer_timezone: Option<String>,
}

#[cfg(feature = "graph")]
impl GraphSettings {
    /// Converts to provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> ClientResult<myschedule_providers::graph::GraphConfig> {
        use myschedule_providers::graph::GraphConfig;

        let credentials = self.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Graph credentials: {}", e)))?;

        let mut config = GraphConfig::new(credentials);
        if let Some(ref tenant) = self.tenant {
            config = config.with_tenant(tenant);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }
        if let Some(ref zone) = self.prefer_timezone {
            config = config.with_prefer_timezone(zone);
        }
        Ok(config)
    }

    /// Resolves the OAuth credentials.
    ///
    /// `client_id` is required; `client_secret` is optional.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<myschedule_providers::graph::OAuthCredentials> {
        use myschedule_providers::graph::OAuthCredentials;

        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            ClientError::Config(format!(
                "Graph client_id not found. Add to {}:\n  \
                 [graph]\n  \
                 client_id = \"YOUR-APPLICATION-ID\"\n\n  \
                 Or run: myschedule logon --client-id <ID>",
                ClientConfig::default_path().display()
            ))
        })?;

        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;

        match self.client_secret.as_deref() {
            Some(raw_secret) => {
                let secret = crate::secret::resolve(raw_secret).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_secret: {}", e))
                })?;
                Ok(OAuthCredentials::confidential(client_id, secret))
            }
            None => Ok(OAuthCredentials::public(client_id)),
        }
    }
}
