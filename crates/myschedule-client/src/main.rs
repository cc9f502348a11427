//! myschedule CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use myschedule_client::cli::{Cli, Command, ConfigAction};
use myschedule_client::commands;
use myschedule_client::config::ClientConfig;
use myschedule_client::error::{ClientError, ClientResult};
use myschedule_core::{ScheduleDay, TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e {
                ClientError::AuthRequired(_) => eprintln!("{}", e),
                _ => eprintln!("error: {}", e),
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config_path();
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    match cli.command {
        #[cfg(feature = "graph")]
        Command::Logon {
            client_id,
            client_secret,
            tenant,
            force,
        } => {
            let args = commands::auth::LogonArgs {
                client_id,
                client_secret,
                tenant,
                force,
            };
            commands::auth::logon(args, &config, &config_path).await
        }
        #[cfg(feature = "graph")]
        Command::Logout => commands::auth::logout(&config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Command::Today => commands::schedule::show(ScheduleDay::Today, &config).await,
        Command::Tomorrow => commands::schedule::show(ScheduleDay::Tomorrow, &config).await,
        Command::Day { date } => commands::schedule::show(ScheduleDay::On(date), &config).await,
    }
}
