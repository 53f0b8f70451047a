//! BitStore - a persisted array of fixed-width bit strings
//!
//! The whole array lives in memory as one [`BitString`]. Every mutation
//! re-encodes the full string and writes it under the store id; the
//! configuration is written next to it under `{id}-config` when the array is
//! (re)initialized, and checked on the next open.

use std::fmt;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, KeyValueStore};
use crate::bits::{BitString, is_binary};
use crate::codec::{Codec, CodecError};
use crate::error::{BitStoreError, Result};
use crate::options::{MergePolicy, StoreConfig, StoreOptions};

/// Why a previously persisted array was discarded on open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReinitReason {
    /// Stored configuration differs from the requested one
    ConfigMismatch,
    /// Value present without its configuration entry
    MissingConfig,
    /// Stored value could not be decoded into an array of the right length
    Corrupt,
}

impl fmt::Display for ReinitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigMismatch => write!(f, "config_mismatch"),
            Self::MissingConfig => write!(f, "missing_config"),
            Self::Corrupt => write!(f, "corrupt"),
        }
    }
}

/// How the array was initialized when the store was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing persisted yet; zero-filled
    Fresh,
    /// Decoded from a compatible persisted value
    Loaded,
    /// A persisted value existed but was replaced with zeros
    Reinitialized(ReinitReason),
}

impl Outcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Outcome::Loaded)
    }

    /// True when opening overwrote previously persisted data
    pub fn discarded_data(&self) -> bool {
        matches!(self, Outcome::Reinitialized(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "fresh"),
            Self::Loaded => write!(f, "loaded"),
            Self::Reinitialized(reason) => write!(f, "reinitialized ({})", reason),
        }
    }
}

/// When mutations reach the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// Write after every mutation
    #[default]
    Immediate,
    /// Write on [`BitStore::flush`] (and best effort on drop)
    Manual,
}

/// Builder for [`BitStore`] with injectable randomness and persist mode
pub struct StoreBuilder<K: KeyValueStore> {
    backend: K,
    options: StoreOptions,
    policy: MergePolicy,
    rng: Option<Box<dyn RngCore + Send>>,
    mode: PersistMode,
}

impl<K: KeyValueStore> StoreBuilder<K> {
    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Random source for [`BitStore::randomize`]; defaults to an OS-seeded `StdRng`
    pub fn rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn persist_mode(mut self, mode: PersistMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolve the configuration, then load or initialize the array
    pub fn open(self) -> Result<BitStore<K>> {
        let config = self.options.resolve(self.policy)?;
        let codec = Codec::new(config.chunk_size)?;
        let rng = self.rng.unwrap_or_else(|| Box::new(StdRng::from_os_rng()));

        let mut store = BitStore {
            backend: self.backend,
            config,
            codec,
            bits: BitString::default(),
            rng,
            mode: self.mode,
            dirty: false,
            outcome: Outcome::Fresh,
        };
        store.outcome = store.initialize()?;
        Ok(store)
    }
}

/// Fixed-capacity array of `item_size`-bit items persisted in a [`KeyValueStore`]
pub struct BitStore<K: KeyValueStore> {
    backend: K,
    config: StoreConfig,
    codec: Codec,
    bits: BitString,
    rng: Box<dyn RngCore + Send>,
    mode: PersistMode,
    dirty: bool,
    outcome: Outcome,
}

impl<K: KeyValueStore> BitStore<K> {
    /// Open with default randomness and immediate persistence
    pub fn open(backend: K, options: StoreOptions) -> Result<Self> {
        Self::builder(backend).options(options).open()
    }

    pub fn builder(backend: K) -> StoreBuilder<K> {
        StoreBuilder {
            backend,
            options: StoreOptions::default(),
            policy: MergePolicy::default(),
            rng: None,
            mode: PersistMode::default(),
        }
    }

    fn initialize(&mut self) -> Result<Outcome> {
        let id = self.config.id.clone();
        let stored = self.backend.get(&id)?.filter(|v| !v.is_empty());
        let stored_config = self.backend.get(&self.config.config_key())?.filter(|v| !v.is_empty());

        let outcome = match (stored, stored_config) {
            (None, _) => Outcome::Fresh,
            (Some(_), None) => Outcome::Reinitialized(ReinitReason::MissingConfig),
            (Some(_), Some(json)) if !self.config.matches_persisted(&json) => {
                Outcome::Reinitialized(ReinitReason::ConfigMismatch)
            }
            (Some(text), Some(_)) => match self.decode(&text) {
                Ok(bits) => {
                    debug!(%id, bits = bits.len(), "Loaded persisted bit array");
                    self.bits = bits;
                    return Ok(Outcome::Loaded);
                }
                Err(e) => {
                    warn!(%id, error = %e, "Persisted bit array is unreadable");
                    Outcome::Reinitialized(ReinitReason::Corrupt)
                }
            },
        };

        if let Outcome::Reinitialized(reason) = outcome {
            info!(%id, %reason, "Reinitializing persisted bit array");
        }

        self.bits = BitString::zeros(self.config.bit_len());
        self.write_value()?;
        self.write_config()?;
        Ok(outcome)
    }

    fn decode(&self, text: &str) -> std::result::Result<BitString, CodecError> {
        let binary = self.codec.text_to_binary(text)?;
        let expected = self.config.bit_len();
        if binary.len() != expected {
            return Err(CodecError::LengthMismatch {
                expected,
                actual: binary.len(),
            });
        }
        Ok(BitString::from_trusted(binary))
    }

    fn write_value(&mut self) -> Result<()> {
        let text = self.codec.binary_to_text(self.bits.as_str())?;
        debug!(id = %self.config.id, bits = self.bits.len(), encoded = text.len(), "Persisting bit array");
        self.backend.set(&self.config.id, text)?;
        self.dirty = false;
        Ok(())
    }

    fn write_config(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.config).map_err(BackendError::from)?;
        self.backend.set(&self.config.config_key(), json)?;
        Ok(())
    }

    fn persist(&mut self) -> Result<()> {
        match self.mode {
            PersistMode::Immediate => {
                // stays dirty if the write fails, so flush can retry
                self.dirty = true;
                self.write_value()
            }
            PersistMode::Manual => {
                self.dirty = true;
                Ok(())
            }
        }
    }

    /// Write pending mutations to the backend
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty {
            self.write_value()?;
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> BitStoreError {
        BitStoreError::OutOfRange {
            index,
            length: self.config.length,
        }
    }

    /// Item at `index`
    pub fn get_item(&self, index: usize) -> Result<&str> {
        let width = self.config.item_size;
        index
            .checked_mul(width)
            .and_then(|start| self.bits.get(start, width))
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Replace the item at `index` and persist
    ///
    /// The value is checked for width, then the index for range, then the
    /// value for non-binary characters.
    pub fn set_item(&mut self, index: usize, value: &str) -> Result<()> {
        let width = self.config.item_size;
        let actual = value.chars().count();
        if actual != width {
            return Err(BitStoreError::SizeMismatch { expected: width, actual });
        }

        let start = index
            .checked_mul(width)
            .filter(|start| self.bits.get(*start, width).is_some())
            .ok_or_else(|| self.out_of_range(index))?;

        if !is_binary(value) {
            return Err(BitStoreError::NotBinary {
                value: value.to_string(),
            });
        }

        self.bits.splice(start, value);
        self.persist()
    }

    /// Iterate over all items in index order
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.bits.items(self.config.item_size)
    }

    /// All items in index order
    pub fn get_all(&self) -> Vec<&str> {
        self.items().collect()
    }

    /// Number of items equal to `value`
    pub fn count_occurrences_of(&self, value: &str) -> usize {
        self.items().filter(|item| *item == value).count()
    }

    /// Replace every bit with a fair coin flip and persist
    pub fn randomize(&mut self) -> Result<()> {
        self.bits = BitString::random(self.config.bit_len(), self.rng.as_mut());
        self.persist()
    }

    /// Zero every bit and persist
    pub fn reset(&mut self) -> Result<()> {
        self.bits = BitString::zeros(self.config.bit_len());
        self.persist()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Persisted text form of the current array
    pub fn encoded(&self) -> Result<String> {
        Ok(self.codec.binary_to_text(self.bits.as_str())?)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.config.length
    }

    pub fn is_empty(&self) -> bool {
        self.config.length == 0
    }

    /// True when mutations are waiting for [`BitStore::flush`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }
}

impl<K: KeyValueStore> fmt::Debug for BitStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitStore")
            .field("config", &self.config)
            .field("outcome", &self.outcome)
            .field("mode", &self.mode)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<K: KeyValueStore> Drop for BitStore<K> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(id = %self.config.id, error = %e, "Failed to flush bit array on drop");
        }
    }
}
