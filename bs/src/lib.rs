//! BitStore - persisted arrays of fixed-width bit strings
//!
//! A [`BitStore`] holds `length` items of `item_size` bits each. The array is
//! kept in memory as one binary string and written, after every mutation, as a
//! single printable text value into a [`KeyValueStore`] under the store id.
//! The configuration that produced the value is written next to it, so a
//! later open with a different shape starts over instead of misreading bits.
//!
//! # Persisted layout
//!
//! ```text
//! {id}          "1**"                                   overflow digit + encoded chunks
//! {id}-config   {"id":..,"chunkSize":7,"length":4,"itemSize":2}
//! ```
//!
//! # Example
//!
//! ```
//! use bitstore::{BitStore, MemoryStore, Outcome, StoreOptions};
//!
//! let backend = MemoryStore::new();
//! let options = StoreOptions::new().with_id("flags").with_length(4).with_item_size(2);
//!
//! let mut store = BitStore::open(backend.clone(), options.clone())?;
//! store.set_item(2, "11")?;
//! drop(store);
//!
//! let store = BitStore::open(backend, options)?;
//! assert_eq!(store.outcome(), Outcome::Loaded);
//! assert_eq!(store.get_all(), vec!["00", "00", "11", "00"]);
//! # Ok::<(), bitstore::BitStoreError>(())
//! ```

pub mod backend;
pub mod bits;
pub mod cli;
pub mod codec;
pub mod config;
mod error;
pub mod options;
mod store;

pub use backend::{BackendError, FileStore, KeyValueStore, MemoryStore};
pub use bits::BitString;
pub use codec::{Codec, CodecError};
pub use error::{BitStoreError, Result};
pub use options::{ConfigError, MergePolicy, StoreConfig, StoreOptions};
pub use store::{BitStore, Outcome, PersistMode, ReinitReason, StoreBuilder};

/// Default bits per encoded character
pub const DEFAULT_CHUNK_SIZE: u8 = 7;

/// Default number of items
pub const DEFAULT_LENGTH: usize = 100;

/// Default bits per item
pub const DEFAULT_ITEM_SIZE: usize = 1;
