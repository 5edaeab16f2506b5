//! Environment variable names understood by [`LoggerConfig::from_env`].
//!
//! These are purely helpers; loggers can always be configured with an
//! explicit [`LoggerConfig`].

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::format::Format;
use crate::init::LoggerConfig;
use crate::record::Level;

/// Minimum level, e.g. `debug` or `WARNING`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Console format: `text`, `plain` or `json`.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Optional path of a size-rotated JSON log file.
pub const LOG_FILE_ENV: &str = "LOG_FILE";

/// File size in bytes that triggers rotation.
pub const LOG_MAX_BYTES_ENV: &str = "LOG_MAX_BYTES";

/// Number of rotated files to keep.
pub const LOG_BACKUP_COUNT_ENV: &str = "LOG_BACKUP_COUNT";

/// When set to any non-empty value, text output is not colored.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

impl LoggerConfig {
    /// Configuration from the process environment, starting from the
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LoggerConfig::default();

        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.level = level.parse::<Level>()?;
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            match format.parse::<Format>()? {
                Format::Json => config.use_json = true,
                Format::Text { colors } => {
                    config.use_json = false;
                    config.use_colors = colors;
                }
            }
        }

        if lookup(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()) {
            config.use_colors = false;
        }

        if let Some(path) = lookup(LOG_FILE_ENV).filter(|p| !p.is_empty()) {
            config.log_file = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(LOG_MAX_BYTES_ENV) {
            config.max_bytes = parse_number(LOG_MAX_BYTES_ENV, &raw)?;
        }

        if let Some(raw) = lookup(LOG_BACKUP_COUNT_ENV) {
            config.backup_count = parse_number(LOG_BACKUP_COUNT_ENV, &raw)?;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(LoggerConfig::from_lookup(lookup(&[])).unwrap(), LoggerConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = LoggerConfig::from_lookup(lookup(&[
            (LOG_LEVEL_ENV, "debug"),
            (LOG_FORMAT_ENV, "json"),
            (LOG_FILE_ENV, "/var/log/app.log"),
            (LOG_MAX_BYTES_ENV, "2048"),
            (LOG_BACKUP_COUNT_ENV, "3"),
        ]))
        .unwrap();

        assert_eq!(config.level, Level::Debug);
        assert!(config.use_json);
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/app.log")));
        assert_eq!(config.max_bytes, 2048);
        assert_eq!(config.backup_count, 3);
    }

    #[test]
    fn no_color_disables_colors() {
        let config = LoggerConfig::from_lookup(lookup(&[(NO_COLOR_ENV, "1")])).unwrap();
        assert!(!config.use_colors);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            LoggerConfig::from_lookup(lookup(&[(LOG_LEVEL_ENV, "loud")])),
            Err(ConfigError::UnknownLevel(_))
        ));
        assert!(matches!(
            LoggerConfig::from_lookup(lookup(&[(LOG_MAX_BYTES_ENV, "ten")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
