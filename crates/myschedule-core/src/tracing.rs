//! Logging setup.
//!
//! Everything goes to standard error. Standard output carries only the
//! rendered schedule so it can be piped straight into a note.
//!
//! The filter comes from, in order: an explicit directive, `RUST_LOG`, then
//! `myschedule=<level>`. `MYSCHEDULE_LOG_FORMAT` (`compact`, `pretty` or
//! `json`) picks the output format when the caller did not.
//!
//! ```ignore
//! use myschedule_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::default())?;
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "MYSCHEDULE_LOG_FORMAT";

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("unknown log format '{0}', expected compact, pretty or json")]
    UnknownFormat(String),
}

/// How log lines are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One short line per event.
    #[default]
    Compact,
    /// Multi-line, human oriented.
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(TracingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Logging options for [`init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for `myschedule*` targets when no filter is given.
    pub level: Level,
    /// `None` defers to `MYSCHEDULE_LOG_FORMAT`, then compact.
    pub format: Option<LogFormat>,
    /// Adds timestamps, targets and source locations.
    pub verbose: bool,
    /// Explicit filter directive, wins over `RUST_LOG`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: None,
            verbose: false,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// The `--debug` configuration.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = Some(directive.into());
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("myschedule={}", self.level)))),
        }
    }

    fn resolved_format(&self) -> Result<LogFormat, TracingError> {
        match self.format {
            Some(format) => Ok(format),
            None => match std::env::var(LOG_FORMAT_ENV) {
                Ok(value) => value.parse(),
                Err(_) => Ok(LogFormat::default()),
            },
        }
    }

    fn layer(&self) -> Result<Box<dyn Layer<Registry> + Send + Sync>, TracingError> {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.verbose)
            .with_line_number(self.verbose)
            .with_target(self.verbose);

        let layer = match (self.resolved_format()?, self.verbose) {
            (LogFormat::Compact, true) => base.compact().boxed(),
            (LogFormat::Compact, false) => base.compact().without_time().boxed(),
            (LogFormat::Pretty, _) => base.pretty().boxed(),
            (LogFormat::Json, _) => base.json().boxed(),
        };
        Ok(layer)
    }
}

/// Installs the global subscriber. Call once, first thing in `main`.
///
/// # Errors
///
/// Fails when a subscriber is already installed, the filter directive does
/// not parse, or `MYSCHEDULE_LOG_FORMAT` names an unknown format.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = tracing_subscriber::registry()
        .with(config.layer()?)
        .with(config.env_filter()?);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quiet() {
        let config = TracingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.verbose);
        assert!(config.format.is_none());
        assert!(config.filter.is_none());
    }

    #[test]
    fn debug_is_verbose() {
        let config = TracingConfig::cli_debug();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.verbose);
    }

    #[test]
    fn explicit_format_wins() {
        let config = TracingConfig::default()
            .with_level(Level::INFO)
            .with_format(LogFormat::Json);
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.resolved_format().unwrap(), LogFormat::Json);
    }

    #[test]
    fn formats_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TracingError::UnknownFormat(_))
        ));
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = TracingConfig::default().with_filter("myschedule=loudest");
        assert!(matches!(config.env_filter(), Err(TracingError::EnvFilter(_))));
    }
}
