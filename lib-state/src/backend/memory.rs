//! In-memory backend

use std::collections::BTreeMap;

use lib_types::Sequence;

use super::{EntryRecord, StateBackend};
use crate::errors::StateResult;
use crate::keys::StorageKey;
use crate::tier::Tier;

/// Ordered in-memory backend, the default for tests and simulation
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    persistent: BTreeMap<StorageKey, EntryRecord>,
    temporary: BTreeMap<StorageKey, EntryRecord>,
    instance: BTreeMap<StorageKey, EntryRecord>,
    instance_live_until: Option<Sequence>,
    instance_sealed: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self, tier: Tier) -> &BTreeMap<StorageKey, EntryRecord> {
        match tier {
            Tier::Persistent => &self.persistent,
            Tier::Temporary => &self.temporary,
            Tier::Instance => &self.instance,
        }
    }

    fn tree_mut(&mut self, tier: Tier) -> &mut BTreeMap<StorageKey, EntryRecord> {
        match tier {
            Tier::Persistent => &mut self.persistent,
            Tier::Temporary => &mut self.temporary,
            Tier::Instance => &mut self.instance,
        }
    }

    /// Number of records physically held in a tier, expired ones included
    pub fn physical_len(&self, tier: Tier) -> usize {
        self.tree(tier).len()
    }
}

impl StateBackend for MemoryBackend {
    fn read(&self, tier: Tier, key: &StorageKey) -> StateResult<Option<EntryRecord>> {
        Ok(self.tree(tier).get(key).cloned())
    }

    fn write(&mut self, tier: Tier, key: &StorageKey, record: &EntryRecord) -> StateResult<()> {
        self.tree_mut(tier).insert(key.clone(), record.clone());
        Ok(())
    }

    fn delete(&mut self, tier: Tier, key: &StorageKey) -> StateResult<bool> {
        Ok(self.tree_mut(tier).remove(key).is_some())
    }

    fn keys(&self, tier: Tier) -> StateResult<Vec<StorageKey>> {
        Ok(self.tree(tier).keys().cloned().collect())
    }

    fn instance_live_until(&self) -> StateResult<Option<Sequence>> {
        Ok(self.instance_live_until)
    }

    fn set_instance_live_until(&mut self, live_until: Option<Sequence>) -> StateResult<()> {
        self.instance_live_until = live_until;
        Ok(())
    }

    fn instance_sealed(&self) -> StateResult<bool> {
        Ok(self.instance_sealed)
    }

    fn seal_instance(&mut self) -> StateResult<()> {
        self.instance_sealed = true;
        Ok(())
    }
}
