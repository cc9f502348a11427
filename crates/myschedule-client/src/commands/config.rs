//! Configuration commands.

use std::path::Path;

use myschedule_core::RulesError;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", config_path.display());
    println!("{}", render(config)?);
    Ok(())
}

/// Serializes `config` with literal client secrets masked.
fn render(config: &ClientConfig) -> ClientResult<String> {
    #[allow(unused_mut)]
    let mut shown = config.clone();

    #[cfg(feature = "graph")]
    if let Some(secret) = shown.graph.as_mut().and_then(|g| g.client_secret.as_mut())
        && !crate::secret::is_reference(secret)
    {
        *secret = "********".to_string();
    }

    toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
///
/// An empty `self_email` is accepted: the address of the signed-in
/// account is used instead.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    for note in check(config)? {
        println!("note: {}", note);
    }
    println!("Configuration is valid.");
    Ok(())
}

fn check(config: &ClientConfig) -> ClientResult<Vec<String>> {
    let mut notes = Vec::new();

    match config.schedule.validate() {
        Ok(()) => {}
        Err(RulesError::MissingSelfEmail) => {
            notes.push("self_email is not set, the signed-in address will be used".to_string());
        }
        Err(e) => return Err(e.into()),
    }

    #[cfg(feature = "graph")]
    match config.graph {
        Some(ref graph) if graph.client_id.is_some() => {
            graph.to_provider_config()?;
            notes.push("Graph credentials are valid".to_string());
        }
        _ => notes.push("no Graph client_id configured, run 'myschedule logon --client-id <ID>'".to_string()),
    }

    Ok(notes)
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    #[cfg(feature = "graph")]
    println!(
        "tokens: {}",
        myschedule_providers::graph::GraphConfig::default_token_path().display()
    );
    Ok(())
}
