//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// myschedule - Your day's meetings as journal bullets
#[derive(Debug, Parser)]
#[command(name = "myschedule")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MYSCHEDULE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Returns the configuration file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::ClientConfig::default_path)
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to Microsoft 365 and store the session
    #[cfg(feature = "graph")]
    Logon {
        /// Application (client) ID of the Azure app registration
        #[arg(long, env = "MYSCHEDULE_CLIENT_ID")]
        client_id: Option<String>,

        /// Client secret, for confidential app registrations
        #[arg(long, env = "MYSCHEDULE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Directory tenant (default: common)
        #[arg(long)]
        tenant: Option<String>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// Forget the stored session
    #[cfg(feature = "graph")]
    Logout,

    /// Print today's meetings
    Today,

    /// Print tomorrow's meetings
    Tomorrow,

    /// Print the meetings of a given date
    Day {
        /// Date as YYYY-MM-DD
        date: NaiveDate,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
