//! initrack - initiative and combat tracker for tabletop sessions
//!
//! Character roster, monster bestiary, initiative-ordered turn tracking,
//! dice rolling, and local persistence with JSON export/import.

pub mod combat;
pub mod dice;
pub mod entities;
pub mod persist;
pub mod store;

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use persist::{FileStorage, MAX_IMPORT_BYTES};
use store::{GameStore, StoreError};

/// Default config file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "initrack.toml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the state store
    pub data_dir: PathBuf,
    /// Namespaced key the state is stored under
    pub storage_key: String,
    /// Import file size ceiling in bytes
    pub max_import_bytes: u64,
    /// Tracing filter used when RUST_LOG is unset
    pub log_filter: String,
    /// Emit log lines as JSON objects
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./.initrack"),
            storage_key: "initrack-game-state".to_string(),
            max_import_bytes: MAX_IMPORT_BYTES,
            log_filter: "initrack=info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Layered configuration: defaults, then the TOML file, then
    /// `INITRACK_*` environment variables
    pub fn figment(file: Option<&Path>) -> Figment {
        let file = file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("INITRACK_"))
    }

    pub fn load(file: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(file).extract()
    }

    /// Open the file-backed store this config points at
    pub fn open_store(&self) -> Result<GameStore, StoreError> {
        let storage = FileStorage::new(&self.data_dir, &self.storage_key);
        GameStore::open(Box::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage_key, "initrack-game-state");
        assert_eq!(config.max_import_bytes, 10 * 1024 * 1024);
        assert_eq!(config.log_filter, "initrack=info");
        assert!(!config.log_json);
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "initrack.toml",
                r#"
                    data_dir = "/tmp/party"
                    storage_key = "from-file"
                "#,
            )?;
            jail.set_env("INITRACK_STORAGE_KEY", "from-env");
            jail.set_env("INITRACK_LOG_JSON", "true");

            let config = Config::load(None)?;
            assert_eq!(config.data_dir, PathBuf::from("/tmp/party"));
            assert_eq!(config.storage_key, "from-env");
            assert_eq!(config.max_import_bytes, MAX_IMPORT_BYTES);
            assert!(config.log_json);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_| {
            let config = Config::load(Some(Path::new("nope.toml")))?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }
}
