//! Storage backends
//!
//! A backend is a dumb byte store addressed by `(tier, key)`. It knows nothing
//! about expiry: TTL decisions live in [`Storage`](crate::Storage), which
//! reads the deadline stored alongside each value.
//!
//! Value and deadline are a single [`EntryRecord`], so they are always written
//! and removed together.

pub mod memory;
pub mod sled_backend;

use lib_types::Sequence;
use serde::{Deserialize, Serialize};

use crate::errors::StateResult;
use crate::keys::StorageKey;
use crate::tier::Tier;

pub use memory::MemoryBackend;
pub use sled_backend::SledBackend;

/// Stored value plus its TTL record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub value: Vec<u8>,
    /// Per-entry deadline. `None` for Instance entries, which are governed by
    /// the namespace deadline.
    pub live_until: Option<Sequence>,
}

/// Raw persistence interface for tiered state
pub trait StateBackend {
    /// Read a record regardless of expiry
    fn read(&self, tier: Tier, key: &StorageKey) -> StateResult<Option<EntryRecord>>;

    /// Insert or overwrite a record
    fn write(&mut self, tier: Tier, key: &StorageKey, record: &EntryRecord) -> StateResult<()>;

    /// Remove a record, returning whether one existed
    fn delete(&mut self, tier: Tier, key: &StorageKey) -> StateResult<bool>;

    /// All keys physically present in a tier, in key order
    fn keys(&self, tier: Tier) -> StateResult<Vec<StorageKey>>;

    /// Shared deadline of the Instance namespace
    fn instance_live_until(&self) -> StateResult<Option<Sequence>>;

    fn set_instance_live_until(&mut self, live_until: Option<Sequence>) -> StateResult<()>;

    /// Whether the Instance namespace was ever sealed. Never cleared by
    /// expiry or eviction.
    fn instance_sealed(&self) -> StateResult<bool>;

    /// Set the one-way sealed marker
    fn seal_instance(&mut self) -> StateResult<()>;

    /// Make previous writes durable. No-op for volatile backends.
    fn flush(&self) -> StateResult<()> {
        Ok(())
    }
}
