//! Tiered Storage Engine
//!
//! Composes a [`StateBackend`] with the [`TtlManager`]. Every operation takes
//! the current ledger sequence explicitly; the engine holds no clock.
//!
//! # Invariants
//!
//! 1. **Expired reads as absent** - `get`/`has` never return an entry whose
//!    deadline has passed, whether or not its bytes are still present.
//! 2. **Writes stamp a minimum TTL** - `set` gives a new entry the tier
//!    minimum and never shortens a live entry's deadline.
//! 3. **Value and TTL move together** - both live in one [`EntryRecord`].
//! 4. **Instance shares one deadline** - when the Instance namespace expires
//!    every Instance entry is gone; a later write starts an empty namespace.
//! 5. **No background renewal** - deadlines only move on `set`, `extend_*`
//!    and `restore_instance`.
//! 6. **Seal is one-way** - once sealed, the Instance namespace stays sealed
//!    through expiry, purge and eviction.

use std::cell::Cell;

use lib_types::Sequence;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{EntryRecord, MemoryBackend, StateBackend};
use crate::config::{StateConfig, TtlPolicy};
use crate::errors::StateResult;
use crate::keys::StorageKey;
use crate::tier::Tier;
use crate::ttl::{ExtendOutcome, TtlManager};

/// Operation counters, used by tests to prove that a rejected call never
/// touched state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageStats {
    pub reads: u64,
    pub writes: u64,
    pub removes: u64,
    pub ttl_extensions: u64,
    pub evictions: u64,
}

impl StorageStats {
    /// Any state-changing operation at all
    pub fn mutations(&self) -> u64 {
        self.writes + self.removes + self.ttl_extensions + self.evictions
    }
}

#[derive(Debug, Default)]
struct Counters {
    reads: Cell<u64>,
    writes: Cell<u64>,
    removes: Cell<u64>,
    ttl_extensions: Cell<u64>,
    evictions: Cell<u64>,
}

impl Counters {
    fn bump(cell: &Cell<u64>, by: u64) {
        cell.set(cell.get().saturating_add(by));
    }

    fn snapshot(&self) -> StorageStats {
        StorageStats {
            reads: self.reads.get(),
            writes: self.writes.get(),
            removes: self.removes.get(),
            ttl_extensions: self.ttl_extensions.get(),
            evictions: self.evictions.get(),
        }
    }
}

/// Entries removed by [`Storage::evict_expired`], per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvictionReport {
    pub persistent: u64,
    pub temporary: u64,
    pub instance: u64,
}

impl EvictionReport {
    pub fn total(&self) -> u64 {
        self.persistent + self.temporary + self.instance
    }
}

/// TTL-gated key/value store with three tiers
#[derive(Debug)]
pub struct Storage<B: StateBackend = MemoryBackend> {
    backend: B,
    ttl: TtlManager,
    counters: Counters,
}

impl Storage<MemoryBackend> {
    /// Volatile storage with the given TTL policy
    pub fn in_memory(policy: TtlPolicy) -> Self {
        Self::new(MemoryBackend::new(), policy)
    }
}

impl Default for Storage<MemoryBackend> {
    fn default() -> Self {
        Self::in_memory(TtlPolicy::default())
    }
}

impl<B: StateBackend> Storage<B> {
    pub fn new(backend: B, policy: TtlPolicy) -> Self {
        Self {
            backend,
            ttl: TtlManager::new(policy),
            counters: Counters::default(),
        }
    }

    pub fn with_config(backend: B, config: &StateConfig) -> Self {
        Self::new(backend, config.ttl)
    }

    pub fn ttl_manager(&self) -> &TtlManager {
        &self.ttl
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stats(&self) -> StorageStats {
        self.counters.snapshot()
    }

    pub fn flush(&self) -> StateResult<()> {
        self.backend.flush()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Live deadline of the Instance namespace, `None` if absent or expired
    pub fn instance_live_until(&self, now: Sequence) -> StateResult<Option<Sequence>> {
        let deadline = self.backend.instance_live_until()?;
        if TtlManager::is_expired(deadline, now) {
            return Ok(None);
        }
        Ok(deadline)
    }

    /// Whether the Instance namespace has ever been sealed
    pub fn is_instance_sealed(&self) -> StateResult<bool> {
        self.backend.instance_sealed()
    }

    /// Sealed namespace whose shared deadline has passed
    pub fn is_instance_archived(&self, now: Sequence) -> StateResult<bool> {
        Ok(self.is_instance_sealed()? && self.instance_live_until(now)?.is_none())
    }

    /// Live record and its effective deadline
    fn live_record(
        &self,
        tier: Tier,
        key: &StorageKey,
        now: Sequence,
    ) -> StateResult<Option<(EntryRecord, Sequence)>> {
        Counters::bump(&self.counters.reads, 1);

        let deadline = if tier.has_shared_ttl() {
            match self.instance_live_until(now)? {
                Some(deadline) => deadline,
                None => return Ok(None),
            }
        } else {
            0
        };

        let record = match self.backend.read(tier, key)? {
            Some(record) => record,
            None => return Ok(None),
        };

        if tier.has_shared_ttl() {
            return Ok(Some((record, deadline)));
        }

        match record.live_until {
            Some(own) if !TtlManager::is_expired(Some(own), now) => Ok(Some((record, own))),
            _ => Ok(None),
        }
    }

    /// Value for `key`, or `None` if missing or expired
    pub fn get(&self, tier: Tier, key: &StorageKey, now: Sequence) -> StateResult<Option<Vec<u8>>> {
        Ok(self.live_record(tier, key, now)?.map(|(record, _)| record.value))
    }

    pub fn has(&self, tier: Tier, key: &StorageKey, now: Sequence) -> StateResult<bool> {
        Ok(self.live_record(tier, key, now)?.is_some())
    }

    /// Effective deadline of a live entry
    pub fn live_until(
        &self,
        tier: Tier,
        key: &StorageKey,
        now: Sequence,
    ) -> StateResult<Option<Sequence>> {
        Ok(self.live_record(tier, key, now)?.map(|(_, deadline)| deadline))
    }

    /// Decode a bincode value
    pub fn get_value<T: DeserializeOwned>(
        &self,
        tier: Tier,
        key: &StorageKey,
        now: Sequence,
    ) -> StateResult<Option<T>> {
        match self.get(tier, key, now)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store `value`, stamping the tier's minimum TTL. Returns the entry's
    /// deadline after the write.
    pub fn set(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        value: Vec<u8>,
        now: Sequence,
    ) -> StateResult<Sequence> {
        let deadline = if tier.has_shared_ttl() {
            let namespace = self.backend.instance_live_until()?;
            if namespace.is_some() && TtlManager::is_expired(namespace, now) {
                self.purge_instance()?;
            }
            let live = self.instance_live_until(now)?;
            let deadline = self.ttl.stamp_on_write(tier, live, now);
            if live != Some(deadline) {
                self.backend.set_instance_live_until(Some(deadline))?;
            }
            self.backend.write(
                tier,
                key,
                &EntryRecord {
                    value,
                    live_until: None,
                },
            )?;
            deadline
        } else {
            let existing = self.backend.read(tier, key)?.and_then(|r| r.live_until);
            let deadline = self.ttl.stamp_on_write(tier, existing, now);
            self.backend.write(
                tier,
                key,
                &EntryRecord {
                    value,
                    live_until: Some(deadline),
                },
            )?;
            deadline
        };

        Counters::bump(&self.counters.writes, 1);
        debug!(%tier, ?key, live_until = deadline, "state write");
        Ok(deadline)
    }

    /// Encode with bincode and store
    pub fn set_value<T: Serialize>(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        value: &T,
        now: Sequence,
    ) -> StateResult<Sequence> {
        let bytes = bincode::serialize(value)?;
        self.set(tier, key, bytes, now)
    }

    /// Delete an entry and its TTL record. Returns whether a live entry was
    /// removed; expired leftovers are dropped silently.
    pub fn remove(&mut self, tier: Tier, key: &StorageKey, now: Sequence) -> StateResult<bool> {
        let was_live = self.has(tier, key, now)?;
        self.backend.delete(tier, key)?;
        Counters::bump(&self.counters.removes, 1);
        debug!(%tier, ?key, was_live, "state remove");
        Ok(was_live)
    }

    // =========================================================================
    // TTL
    // =========================================================================

    /// Extend with an absolute target deadline.
    ///
    /// For [`Tier::Instance`] this extends the shared namespace deadline,
    /// provided `key` is live.
    pub fn extend_ttl_to(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        threshold: Sequence,
        new_live_until: Sequence,
        now: Sequence,
    ) -> StateResult<ExtendOutcome> {
        let (mut record, deadline) = match self.live_record(tier, key, now)? {
            Some(live) => live,
            None => return Ok(ExtendOutcome::Missing),
        };

        if tier.has_shared_ttl() {
            return self.extend_instance_ttl_to(threshold, new_live_until, now);
        }

        let outcome = self.ttl.extend(Some(deadline), now, threshold, new_live_until);
        if let ExtendOutcome::Extended { from, to } = outcome {
            record.live_until = Some(to);
            self.backend.write(tier, key, &record)?;
            Counters::bump(&self.counters.ttl_extensions, 1);
            debug!(%tier, ?key, from, to, "ttl extended");
        }
        Ok(outcome)
    }

    /// Extend with a target relative to `now`: `live_until = now + extend_to`
    /// when the remaining lifetime is below `threshold`
    pub fn extend_ttl(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        threshold: Sequence,
        extend_to: Sequence,
        now: Sequence,
    ) -> StateResult<ExtendOutcome> {
        self.extend_ttl_to(tier, key, threshold, now.saturating_add(extend_to), now)
    }

    /// Extend the Instance namespace deadline with an absolute target
    pub fn extend_instance_ttl_to(
        &mut self,
        threshold: Sequence,
        new_live_until: Sequence,
        now: Sequence,
    ) -> StateResult<ExtendOutcome> {
        let live = self.instance_live_until(now)?;
        let outcome = self.ttl.extend(live, now, threshold, new_live_until);
        if let ExtendOutcome::Extended { from, to } = outcome {
            self.backend.set_instance_live_until(Some(to))?;
            Counters::bump(&self.counters.ttl_extensions, 1);
            debug!(from, to, "instance ttl extended");
        }
        Ok(outcome)
    }

    /// Extend the Instance namespace deadline relative to `now`
    pub fn extend_instance_ttl(
        &mut self,
        threshold: Sequence,
        extend_to: Sequence,
        now: Sequence,
    ) -> StateResult<ExtendOutcome> {
        self.extend_instance_ttl_to(threshold, now.saturating_add(extend_to), now)
    }

    /// Bring an expired Instance namespace back to life with the tier minimum
    /// TTL, provided its entries were never evicted. A live namespace is left
    /// alone; a purged one reports `Missing`.
    pub fn restore_instance(&mut self, now: Sequence) -> StateResult<ExtendOutcome> {
        let from = match self.backend.instance_live_until()? {
            None => return Ok(ExtendOutcome::Missing),
            Some(deadline) if !TtlManager::is_expired(Some(deadline), now) => {
                return Ok(ExtendOutcome::Unchanged { live_until: deadline });
            }
            Some(deadline) => deadline,
        };

        let to = self.ttl.stamp_on_write(Tier::Instance, None, now);
        self.backend.set_instance_live_until(Some(to))?;
        Counters::bump(&self.counters.ttl_extensions, 1);
        debug!(from, to, "instance namespace restored");
        Ok(ExtendOutcome::Extended { from, to })
    }

    /// Mark the Instance namespace as set up. Idempotent.
    pub fn seal_instance(&mut self) -> StateResult<()> {
        if self.backend.instance_sealed()? {
            return Ok(());
        }
        self.backend.seal_instance()?;
        Counters::bump(&self.counters.writes, 1);
        debug!("instance namespace sealed");
        Ok(())
    }

    // =========================================================================
    // Eviction
    // =========================================================================

    fn purge_instance(&mut self) -> StateResult<u64> {
        let keys = self.backend.keys(Tier::Instance)?;
        for key in &keys {
            self.backend.delete(Tier::Instance, key)?;
        }
        self.backend.set_instance_live_until(None)?;
        Counters::bump(&self.counters.evictions, keys.len() as u64);
        debug!(evicted = keys.len(), "instance namespace purged");
        Ok(keys.len() as u64)
    }

    /// Physically drop every expired entry. Reads already treat them as
    /// absent, so this only reclaims space.
    pub fn evict_expired(&mut self, now: Sequence) -> StateResult<EvictionReport> {
        let mut report = EvictionReport::default();

        for tier in [Tier::Persistent, Tier::Temporary] {
            let mut evicted = 0u64;
            for key in self.backend.keys(tier)? {
                let expired = match self.backend.read(tier, &key)? {
                    Some(record) => TtlManager::is_expired(record.live_until, now),
                    None => false,
                };
                if expired {
                    self.backend.delete(tier, &key)?;
                    evicted += 1;
                }
            }
            match tier {
                Tier::Persistent => report.persistent = evicted,
                _ => report.temporary = evicted,
            }
            Counters::bump(&self.counters.evictions, evicted);
        }

        let namespace = self.backend.instance_live_until()?;
        if namespace.is_some() && TtlManager::is_expired(namespace, now) {
            report.instance = self.purge_instance()?;
        }

        if report.total() > 0 {
            debug!(?report, now, "evicted expired entries");
        }
        Ok(report)
    }
}
