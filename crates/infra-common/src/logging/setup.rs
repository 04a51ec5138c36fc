use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::errors::types::{Error, Result};

/// How the process-wide subscriber is built
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level; a `RUST_LOG` directive takes precedence
    pub level: Level,
    /// One JSON object per event instead of the human format
    pub json: bool,
    pub app_name: String,
}

impl LoggingConfig {
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        Self {
            level,
            json: false,
            app_name: app_name.into(),
        }
    }

    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy()
    }
}

/// Install the global subscriber.
///
/// Events go to stderr so command output on stdout stays clean. Fails if a
/// subscriber is already installed.
pub fn setup_logging(config: LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::Logging(format!("{}: {}", config.app_name, e)))?;

    tracing::debug!("Logging ready for {} at {}", config.app_name, config.level);
    Ok(())
}

/// Parse `trace`, `debug`, `info`, `warn` or `error`, in any case
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| Error::Config(format!("Invalid log level: {}", level)))
}

pub fn log_welcome(app_name: &str, version: &str) {
    tracing::info!("🚀 Starting {} v{}", app_name, version);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level(" WARN ").unwrap(), Level::WARN);
        assert!(matches!(parse_log_level("loud"), Err(Error::Config(_))));
    }

    #[test]
    fn test_json_is_opt_in() {
        let config = LoggingConfig::new(Level::DEBUG, "outdial-test");
        assert!(!config.json);
        assert_eq!(config.app_name, "outdial-test");
        assert!(config.with_json().json);
    }

    #[test]
    fn test_second_install_is_rejected() {
        // Only this test installs a subscriber in this crate
        setup_logging(LoggingConfig::new(Level::INFO, "outdial-test")).unwrap();
        let err = setup_logging(LoggingConfig::new(Level::INFO, "outdial-again")).unwrap_err();
        assert!(matches!(err, Error::Logging(ref msg) if msg.starts_with("outdial-again")));
    }
}
