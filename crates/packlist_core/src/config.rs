//! Runtime configuration resolved from the process environment.
//!
//! # Invariants
//! - Blank variables are treated as unset.
//! - Defaults never depend on the current working directory.

use crate::logging::{default_log_level, LogLevel};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "PACKLIST_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "PACKLIST_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "PACKLIST_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "packlist.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "packlist-logs";

/// Engine configuration for database and logging bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    pub log_dir: PathBuf,
}

impl CoreConfig {
    /// Reads `PACKLIST_DB_PATH`, `PACKLIST_LOG_LEVEL` and `PACKLIST_LOG_DIR`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_level = match read(LOG_LEVEL_ENV) {
            Some(value) => LogLevel::parse(&value)?,
            None => default_log_level(),
        };
        let log_dir = read(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn explicit_values_override_defaults() {
        let vars = HashMap::from([
            (DB_PATH_ENV, "/data/lists.sqlite3"),
            (LOG_LEVEL_ENV, "warning"),
            (LOG_DIR_ENV, " /var/log/packlist "),
        ]);
        let config = CoreConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("config should resolve");
        assert_eq!(config.db_path, PathBuf::from("/data/lists.sqlite3"));
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/packlist"));
    }

    #[test]
    fn blank_values_fall_back_and_bad_level_fails() {
        let config = CoreConfig::from_lookup(|key| (key == DB_PATH_ENV).then(|| "  ".to_string()))
            .expect("config should resolve");
        assert!(config.db_path.ends_with(DEFAULT_DB_FILE_NAME));
        assert_eq!(config.log_level, default_log_level());

        let error = CoreConfig::from_lookup(|key| (key == LOG_LEVEL_ENV).then(|| "x".to_string()))
            .expect_err("unknown level");
        assert!(error.contains("unsupported log level"));
    }
}
