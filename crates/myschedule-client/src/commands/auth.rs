//! Authentication commands.

use std::path::Path;

use tracing::{info, warn};

use myschedule_providers::CalendarProvider;
use myschedule_providers::graph::{GraphConfig, GraphProvider, TokenStorage};

use crate::config::{ClientConfig, GraphSettings};
use crate::error::{ClientError, ClientResult};

/// Flags given to `myschedule logon`.
#[derive(Debug, Default, Clone)]
pub struct LogonArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant: Option<String>,
    pub force: bool,
}

/// Run the Microsoft sign-in flow.
///
/// Flags take precedence over `config.toml`. Values that came from flags
/// are written back to `config_path` so later runs find them.
pub async fn logon(args: LogonArgs, config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let (settings, source) = merge_settings(&args, config.graph.as_ref());
    let provider = GraphProvider::new(settings.to_provider_config()?)?;

    if provider.is_authenticated() && !args.force {
        persist(&settings, source, config_path);
        println!("Already signed in to Microsoft 365.");
        println!("Use --force to sign in again.");
        return Ok(());
    }

    println!("Starting Microsoft 365 sign-in...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    provider.authenticate().await?;
    persist(&settings, source, config_path);

    match provider.signed_in_address().await {
        Ok(address) => println!("Signed in as {}.", address),
        Err(e) => warn!("could not read the signed-in address: {}", e),
    }
    println!("Session saved to {}.", provider.token_path().display());

    Ok(())
}

/// Forget the stored session.
pub fn logout(config: &ClientConfig) -> ClientResult<()> {
    let path = config
        .graph
        .as_ref()
        .and_then(|g| g.token_path.clone())
        .unwrap_or_else(GraphConfig::default_token_path);

    if !path.exists() {
        println!("Not signed in.");
        return Ok(());
    }

    TokenStorage::new(&path).clear()?;
    println!("Signed out. Removed {}.", path.display());
    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CredentialSource {
    /// At least one value came from a flag or its environment variable.
    Cli,
    /// Everything came from config.toml.
    Config,
}

/// Overlays the logon flags onto the `[graph]` section.
fn merge_settings(
    args: &LogonArgs,
    config_graph: Option<&GraphSettings>,
) -> (GraphSettings, CredentialSource) {
    let mut settings = config_graph.cloned().unwrap_or_default();
    let mut source = CredentialSource::Config;

    if let Some(ref id) = args.client_id {
        if settings.client_id.as_deref() != Some(id) {
            // A different app registration does not share the old secret.
            settings.client_secret = None;
        }
        settings.client_id = Some(id.clone());
        source = CredentialSource::Cli;
    }
    if let Some(ref secret) = args.client_secret {
        settings.client_secret = Some(secret.clone());
        source = CredentialSource::Cli;
    }
    if let Some(ref tenant) = args.tenant {
        settings.tenant = Some(tenant.clone());
        source = CredentialSource::Cli;
    }

    (settings, source)
}

fn persist(settings: &GraphSettings, source: CredentialSource, config_path: &Path) {
    if source == CredentialSource::Config {
        return;
    }
    match save_credentials(config_path, settings) {
        Ok(()) => println!("Credentials saved to {}", config_path.display()),
        Err(e) => warn!("could not save credentials: {}", e),
    }
}

/// Writes the credential keys of `settings` under `[graph]` in `path`.
///
/// Other tables, keys and comments in the file are left untouched. The file
/// and its directory are created when missing.
pub fn save_credentials(path: &Path, settings: &GraphSettings) -> ClientResult<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::Config(format!("could not parse {} for writing: {}", path.display(), e))
    })?;

    if !doc.contains_key("graph") {
        doc["graph"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let graph = doc["graph"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!("`graph` in {} is not a table", path.display()))
    })?;

    for (key, value) in [
        ("client_id", &settings.client_id),
        ("client_secret", &settings.client_secret),
        ("tenant", &settings.tenant),
    ] {
        match value {
            Some(v) => graph[key] = toml_edit::value(v.as_str()),
            None => {
                graph.remove(key);
            }
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, doc.to_string())?;
    info!("credentials saved to {}", path.display());
    Ok(())
}
