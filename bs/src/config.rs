//! Configuration for the bs command

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::options::StoreOptions;

/// Project-local config file name, checked first when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "bitstore.yml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Path to the JSON key-value store file
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Bits per encoded character for new arrays
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u8,

    /// Items in new arrays
    #[serde(default = "default_length")]
    pub length: usize,

    /// Bits per item in new arrays
    #[serde(default = "default_item_size")]
    pub item_size: usize,
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bitstore")
        .join("store.json")
}

fn default_chunk_size() -> u8 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_length() -> usize {
    crate::DEFAULT_LENGTH
}

fn default_item_size() -> usize {
    crate::DEFAULT_ITEM_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            chunk_size: default_chunk_size(),
            length: default_length(),
            item_size: default_item_size(),
        }
    }
}

impl Config {
    /// Load config with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let default_paths = [
            Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
            dirs::config_dir().map(|p| p.join("bitstore").join("bitstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                match Self::load_from_file(path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::debug!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Options for a new array named `id`, using this config's shape
    pub fn store_options(&self, id: &str) -> StoreOptions {
        StoreOptions::new()
            .with_id(id)
            .with_chunk_size(self.chunk_size)
            .with_length(self.length)
            .with_item_size(self.item_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("length: 16\nitem-size: 4\n").unwrap();
        assert_eq!(config.length, 16);
        assert_eq!(config.item_size, 4);
        assert_eq!(config.chunk_size, crate::DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bitstore.yml");
        let config = Config {
            store_path: temp.path().join("store.json"),
            chunk_size: 6,
            length: 12,
            item_size: 3,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.store_path, config.store_path);
        assert_eq!(loaded.chunk_size, 6);
        assert_eq!(loaded.length, 12);
        assert_eq!(loaded.item_size, 3);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_store_options() {
        let config = Config {
            length: 8,
            ..Config::default()
        };
        let options = config.store_options("demo");
        assert_eq!(options.id.as_deref(), Some("demo"));
        assert_eq!(options.length, Some(8));
        assert_eq!(options.chunk_size, Some(crate::DEFAULT_CHUNK_SIZE));
    }
}
