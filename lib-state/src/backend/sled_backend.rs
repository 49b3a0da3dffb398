//! Sled-based StateBackend implementation
//!
//! One tree per tier plus a `meta` tree for the Instance namespace deadline
//! and its sealed marker.
//! Records are bincode-encoded [`EntryRecord`]s. Do not rely on sled-specific
//! features beyond basic KV.

use std::path::Path;

use lib_types::Sequence;
use sled::{Db, Tree};
use tracing::debug;

use super::{EntryRecord, StateBackend};
use crate::errors::{StateError, StateResult};
use crate::keys::StorageKey;
use crate::tier::Tier;

// =============================================================================
// TREE NAMES (FIXED - DO NOT CHANGE)
// =============================================================================

const TREE_META: &str = "meta";
const META_INSTANCE_LIVE_UNTIL: &[u8] = b"instance_live_until";
const META_INSTANCE_SEALED: &[u8] = b"instance_sealed";

/// Durable backend on an embedded sled database
pub struct SledBackend {
    db: Db,
    persistent: Tree,
    temporary: Tree,
    instance: Tree,
    meta: Tree,
}

impl std::fmt::Debug for SledBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledBackend")
            .field("persistent", &self.persistent.len())
            .field("temporary", &self.temporary.len())
            .field("instance", &self.instance.len())
            .finish_non_exhaustive()
    }
}

impl SledBackend {
    /// Open or create a database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StateResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway database that is deleted on drop
    pub fn open_temporary() -> StateResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StateResult<Self> {
        let persistent = db.open_tree(Tier::Persistent.as_str())?;
        let temporary = db.open_tree(Tier::Temporary.as_str())?;
        let instance = db.open_tree(Tier::Instance.as_str())?;
        let meta = db.open_tree(TREE_META)?;
        debug!(
            persistent = persistent.len(),
            temporary = temporary.len(),
            instance = instance.len(),
            "opened sled state backend"
        );
        Ok(Self {
            db,
            persistent,
            temporary,
            instance,
            meta,
        })
    }

    fn tree(&self, tier: Tier) -> &Tree {
        match tier {
            Tier::Persistent => &self.persistent,
            Tier::Temporary => &self.temporary,
            Tier::Instance => &self.instance,
        }
    }
}

impl StateBackend for SledBackend {
    fn read(&self, tier: Tier, key: &StorageKey) -> StateResult<Option<EntryRecord>> {
        match self.tree(tier).get(key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&mut self, tier: Tier, key: &StorageKey, record: &EntryRecord) -> StateResult<()> {
        let bytes = bincode::serialize(record)?;
        self.tree(tier).insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn delete(&mut self, tier: Tier, key: &StorageKey) -> StateResult<bool> {
        Ok(self.tree(tier).remove(key.as_bytes())?.is_some())
    }

    fn keys(&self, tier: Tier) -> StateResult<Vec<StorageKey>> {
        self.tree(tier)
            .iter()
            .keys()
            .map(|k| {
                let k = k?;
                StorageKey::from_bytes(k.to_vec())
            })
            .collect()
    }

    fn instance_live_until(&self) -> StateResult<Option<Sequence>> {
        match self.meta.get(META_INSTANCE_LIVE_UNTIL)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    StateError::Backend(format!(
                        "corrupt instance deadline: {} bytes",
                        bytes.len()
                    ))
                })?;
                Ok(Some(u64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    fn set_instance_live_until(&mut self, live_until: Option<Sequence>) -> StateResult<()> {
        match live_until {
            Some(deadline) => {
                self.meta
                    .insert(META_INSTANCE_LIVE_UNTIL, deadline.to_be_bytes().to_vec())?;
            }
            None => {
                self.meta.remove(META_INSTANCE_LIVE_UNTIL)?;
            }
        }
        Ok(())
    }

    fn instance_sealed(&self) -> StateResult<bool> {
        Ok(self.meta.contains_key(META_INSTANCE_SEALED)?)
    }

    fn seal_instance(&mut self) -> StateResult<()> {
        self.meta.insert(META_INSTANCE_SEALED, vec![1u8])?;
        Ok(())
    }

    fn flush(&self) -> StateResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
