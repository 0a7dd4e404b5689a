//! Runtime configuration for the core.
//!
//! # Responsibility
//! - Collect database location, logging settings and conflict retry policy.
//! - Read them from the process environment with safe fallbacks.
//!
//! # Invariants
//! - `from_env` never fails; unset or unparsable values use defaults.
//! - `RetryPolicy::max_attempts` is at least one.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::default_log_level;
use rusqlite::Connection;
use std::path::PathBuf;

/// Database file path. Unset means a private in-memory database.
pub const ENV_DATABASE_PATH: &str = "TODO_CORE_DB";
/// Log level (`trace|debug|info|warn|error`).
pub const ENV_LOG_LEVEL: &str = "TODO_CORE_LOG_LEVEL";
/// Absolute log directory. Unset disables file logging.
pub const ENV_LOG_DIR: &str = "TODO_CORE_LOG_DIR";
/// Attempts per write unit when the store reports a position conflict.
pub const ENV_CONFLICT_RETRIES: &str = "TODO_CORE_CONFLICT_RETRIES";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Bounded retry for write units that fail with a position conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Policy with `max_attempts` tries, floored at one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Single attempt; conflicts surface immediately.
    pub fn no_retry() -> Self {
        Self::new(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Reads configuration from `TODO_CORE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let retry = non_blank(ENV_CONFLICT_RETRIES)
            .and_then(|value| value.parse::<u32>().ok())
            .map(RetryPolicy::new)
            .unwrap_or(defaults.retry);

        Self {
            database_path: non_blank(ENV_DATABASE_PATH).map(PathBuf::from),
            log_level: non_blank(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: non_blank(ENV_LOG_DIR).map(PathBuf::from),
            retry,
        }
    }

    /// Opens the configured database with migrations applied.
    pub fn open_database(&self) -> DbResult<Connection> {
        match &self.database_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, RetryPolicy, ENV_CONFLICT_RETRIES, ENV_DATABASE_PATH, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn reads_paths_and_retry_count() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DATABASE_PATH, "/var/lib/todo/todo.db"),
            (ENV_LOG_DIR, " /var/log/todo "),
            (ENV_CONFLICT_RETRIES, "5"),
        ]));
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/todo/todo.db"))
        );
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/todo")));
        assert_eq!(config.retry, RetryPolicy::new(5));
    }

    #[test]
    fn invalid_retry_count_falls_back_and_zero_is_floored() {
        let garbage = CoreConfig::from_lookup(lookup(&[(ENV_CONFLICT_RETRIES, "many")]));
        assert_eq!(garbage.retry, RetryPolicy::default());

        let zero = CoreConfig::from_lookup(lookup(&[(ENV_CONFLICT_RETRIES, "0")]));
        assert_eq!(zero.retry.max_attempts, 1);
    }

    #[test]
    fn open_database_defaults_to_memory() {
        let conn = CoreConfig::default().open_database().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }
}
