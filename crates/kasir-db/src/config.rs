//! # Database Settings
//!
//! File and environment configuration for [`DbConfig`].
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASIR_DB_PATH=/srv/kasir/kasir.db                                  │
//! │     KASIR_DB_MAX_CONNECTIONS=8                                         │
//! │     KASIR_TX_MAX_WAIT_MS=2000                                          │
//! │     KASIR_TX_TIMEOUT_MS=5000                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kasir-pos/kasir.toml (Linux)                             │
//! │     ~/Library/Application Support/id.kasir.pos/kasir.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     database in the platform data directory, 5 connections            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # kasir.toml
//! path = "/srv/kasir/kasir.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//! idle_timeout_secs = 600
//! run_migrations = true
//!
//! [transaction]
//! max_wait_ms = 2000
//! timeout_ms = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::{DbConfig, TransactionOptions};

/// Database file name inside the data directory.
const DB_FILE_NAME: &str = "kasir.db";

// =============================================================================
// Transaction Settings
// =============================================================================

/// Default limits of interactive transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSettings {
    /// Longest wait for a connection and `BEGIN` (milliseconds).
    #[serde(default = "default_max_wait")]
    pub max_wait_ms: u64,

    /// Longest run time of a transaction callback (milliseconds).
    #[serde(default = "default_tx_timeout")]
    pub timeout_ms: u64,
}

fn default_max_wait() -> u64 {
    2_000
}

fn default_tx_timeout() -> u64 {
    5_000
}

impl Default for TransactionSettings {
    fn default() -> Self {
        TransactionSettings {
            max_wait_ms: default_max_wait(),
            timeout_ms: default_tx_timeout(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Complete database configuration as read from file and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to `kasir.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,

    #[serde(default)]
    pub transaction: TransactionSettings,
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: true,
            transaction: TransactionSettings::default(),
        }
    }
}

impl DatabaseSettings {
    /// Loads settings from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`kasir.toml`), when it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut settings = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading database settings from file");
                let contents = std::fs::read_to_string(&path)?;
                settings = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Settings file not found, using defaults");
            }
        }

        settings.apply_overrides(|name| std::env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `KASIR_*` overrides read through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> DbResult<()> {
        if let Some(path) = var("KASIR_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = var("KASIR_DB_MAX_CONNECTIONS") {
            self.max_connections = parse_env("KASIR_DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = var("KASIR_TX_MAX_WAIT_MS") {
            self.transaction.max_wait_ms = parse_env("KASIR_TX_MAX_WAIT_MS", &raw)?;
        }
        if let Some(raw) = var("KASIR_TX_TIMEOUT_MS") {
            self.transaction.timeout_ms = parse_env("KASIR_TX_TIMEOUT_MS", &raw)?;
        }
        Ok(())
    }

    /// Validates the settings.
    pub fn validate(&self) -> DbResult<()> {
        if self.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DbError::InvalidConfig(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.transaction.max_wait_ms == 0 || self.transaction.timeout_ms == 0 {
            return Err(DbError::InvalidConfig(
                "transaction limits must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Resolved database file path.
    pub fn database_path(&self) -> PathBuf {
        self.path
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("id", "kasir", "pos")
                    .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
            })
            .unwrap_or_else(|| PathBuf::from(DB_FILE_NAME))
    }

    /// Converts into a pool configuration.
    pub fn into_db_config(self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .run_migrations(self.run_migrations)
            .transaction_options(TransactionOptions {
                max_wait: Duration::from_millis(self.transaction.max_wait_ms),
                timeout: Duration::from_millis(self.transaction.timeout_ms),
            })
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "kasir", "pos")
            .map(|dirs| dirs.config_dir().join("kasir.toml"))
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> DbResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| DbError::InvalidConfig(format!("{name} has an invalid value: '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = DatabaseSettings::default();
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.transaction.max_wait_ms, 2_000);
        assert_eq!(settings.transaction.timeout_ms, 5_000);
        assert!(settings.database_path().ends_with(DB_FILE_NAME));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: DatabaseSettings = toml::from_str(
            r#"
            path = "/tmp/kasir-test.db"
            max_connections = 8

            [transaction]
            timeout_ms = 10000
            "#,
        )
        .unwrap();

        assert_eq!(settings.database_path(), PathBuf::from("/tmp/kasir-test.db"));
        assert_eq!(settings.max_connections, 8);
        assert_eq!(settings.min_connections, 1);
        assert_eq!(settings.transaction.max_wait_ms, 2_000);
        assert_eq!(settings.transaction.timeout_ms, 10_000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("KASIR_DB_PATH", "/srv/kasir.db"),
            ("KASIR_DB_MAX_CONNECTIONS", "3"),
            ("KASIR_TX_TIMEOUT_MS", "750"),
        ]
        .into_iter()
        .collect();

        let mut settings = DatabaseSettings::default();
        settings
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.path, Some(PathBuf::from("/srv/kasir.db")));
        assert_eq!(settings.max_connections, 3);
        assert_eq!(settings.transaction.timeout_ms, 750);

        let err = settings
            .apply_overrides(|name| (name == "KASIR_TX_MAX_WAIT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }

    #[test]
    fn test_validation() {
        let mut settings = DatabaseSettings::default();
        settings.min_connections = 10;
        assert!(settings.validate().is_err());

        settings.min_connections = 1;
        settings.transaction.max_wait_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("kasir-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "max_connections = 2\nrun_migrations = false\n").unwrap();

        let settings = DatabaseSettings::load(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.max_connections, 2);
        assert!(!settings.run_migrations);

        let broken = std::env::temp_dir().join(format!("kasir-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&broken, "max_connections = \"many\"").unwrap();
        let err = DatabaseSettings::load(Some(broken.clone())).unwrap_err();
        std::fs::remove_file(&broken).unwrap();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }

    #[test]
    fn test_into_db_config() {
        let settings = DatabaseSettings {
            path: Some(PathBuf::from("/tmp/pos.db")),
            transaction: TransactionSettings {
                max_wait_ms: 100,
                timeout_ms: 200,
            },
            ..Default::default()
        };
        let config = settings.into_db_config();
        assert_eq!(config.database_path, PathBuf::from("/tmp/pos.db"));
        assert_eq!(config.transaction.max_wait, Duration::from_millis(100));
        assert_eq!(config.transaction.timeout, Duration::from_millis(200));
        assert!(config.run_migrations);
    }
}
