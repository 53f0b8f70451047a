//! Store configuration: caller options, merge rules and the persisted form

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::codec::MAX_CHUNK_SIZE;

/// Suffix of the key holding the configuration an array was persisted with
pub const CONFIG_KEY_SUFFIX: &str = "-config";

/// Key under which the configuration for `id` is stored
pub fn config_key(id: &str) -> String {
    format!("{}{}", id, CONFIG_KEY_SUFFIX)
}

/// Generate a random store id
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Errors in a resolved store configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Chunk size {0} out of range (1..={MAX_CHUNK_SIZE})")]
    ChunkSize(u8),

    #[error("Item size must be at least 1")]
    ItemSize,

    #[error("Store id must not be empty")]
    EmptyId,

    #[error("Array of {length} items x {item_size} bits is too large")]
    TooLarge { length: usize, item_size: usize },
}

/// How caller options are laid over the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Zero numbers and empty strings count as not provided
    #[default]
    IgnoreFalsy,
    /// Any provided value wins, zero included
    Presence,
}

/// Caller-supplied store options; unset fields take defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    pub id: Option<String>,
    pub chunk_size: Option<u8>,
    pub length: Option<usize>,
    pub item_size: Option<usize>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u8) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_item_size(mut self, item_size: usize) -> Self {
        self.item_size = Some(item_size);
        self
    }

    /// Merge over the defaults and validate
    pub fn resolve(&self, policy: MergePolicy) -> Result<StoreConfig, ConfigError> {
        let config = StoreConfig {
            id: pick(self.id.clone(), policy, String::is_empty).unwrap_or_else(generate_id),
            chunk_size: pick(self.chunk_size, policy, |v| *v == 0).unwrap_or(crate::DEFAULT_CHUNK_SIZE),
            length: pick(self.length, policy, |v| *v == 0).unwrap_or(crate::DEFAULT_LENGTH),
            item_size: pick(self.item_size, policy, |v| *v == 0).unwrap_or(crate::DEFAULT_ITEM_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}

fn pick<T>(value: Option<T>, policy: MergePolicy, is_falsy: impl Fn(&T) -> bool) -> Option<T> {
    match policy {
        MergePolicy::IgnoreFalsy => value.filter(|v| !is_falsy(v)),
        MergePolicy::Presence => value,
    }
}

/// Resolved configuration of one persisted array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Key of the encoded array in the backend
    pub id: String,

    /// Bits per encoded character
    pub chunk_size: u8,

    /// Number of items
    pub length: usize,

    /// Bits per item
    pub item_size: usize,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::EmptyId);
        }
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ChunkSize(self.chunk_size));
        }
        if self.item_size == 0 {
            return Err(ConfigError::ItemSize);
        }
        if self.length.checked_mul(self.item_size).is_none() {
            return Err(ConfigError::TooLarge {
                length: self.length,
                item_size: self.item_size,
            });
        }
        Ok(())
    }

    /// Total bits in the array
    pub fn bit_len(&self) -> usize {
        self.length * self.item_size
    }

    pub fn config_key(&self) -> String {
        config_key(&self.id)
    }

    /// Compare against a configuration persisted as JSON
    ///
    /// Every field of `self` must be present and loosely equal in the stored
    /// object: numbers compare by value, and a decimal string equals the number
    /// it spells. Extra stored fields are ignored.
    pub fn matches_persisted(&self, stored: &str) -> bool {
        let Ok(Value::Object(stored)) = serde_json::from_str::<Value>(stored) else {
            return false;
        };
        let Ok(Value::Object(current)) = serde_json::to_value(self) else {
            return false;
        };
        current
            .iter()
            .all(|(key, value)| stored.get(key).is_some_and(|old| loosely_equal(value, old)))
    }
}

fn loosely_equal(current: &Value, stored: &Value) -> bool {
    match (current, stored) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim().parse::<f64>().ok() == n.as_f64()
        }
        _ => current == stored,
    }
}
