//! Tiered Contract State
//!
//! TTL-gated key/value storage for contract state, split into three tiers.
//!
//! # Key Types
//!
//! - [`Storage`]: The storage engine (get/set/has/remove/extend)
//! - [`Tier`]: Persistent, Temporary or Instance namespace
//! - [`StorageKey`]: Canonical tagged key encoding
//! - [`TtlManager`]: Lifetime stamping and the extension threshold rule
//! - [`LedgerClock`]: Source of the current ledger sequence
//!
//! # Backends
//!
//! [`MemoryBackend`] for tests and ephemeral hosts, [`SledBackend`] for
//! durable state.

pub mod backend;
pub mod clock;
pub mod config;
pub mod errors;
pub mod keys;
pub mod storage;
pub mod tier;
pub mod ttl;

pub use backend::{EntryRecord, MemoryBackend, SledBackend, StateBackend};
pub use clock::{LedgerClock, LedgerInfo, ManualClock};
pub use config::{StateConfig, TtlPolicy};
pub use errors::{ConfigError, StateError, StateResult};
pub use keys::{KeyPart, StorageKey};
pub use storage::{EvictionReport, Storage, StorageStats};
pub use tier::Tier;
pub use ttl::{ExtendOutcome, TtlManager};
