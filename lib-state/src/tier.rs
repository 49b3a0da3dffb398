//! Storage tiers
//!
//! Three independent namespaces with distinct lifetime policy. The caller
//! always names the tier; nothing routes keys between tiers automatically.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage namespace selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Long-lived data (balances). Kept alive only by explicit TTL extension.
    Persistent,
    /// Short-lived data (allowances, nonces). Default TTL is a few ledgers.
    Temporary,
    /// Per-instance configuration. One TTL shared by the whole namespace.
    Instance,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Persistent, Tier::Temporary, Tier::Instance];

    /// Stable name, also used as the sled tree name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tier::Persistent => "persistent",
            Tier::Temporary => "temporary",
            Tier::Instance => "instance",
        }
    }

    /// Whether entries in this tier share a single namespace TTL
    pub const fn has_shared_ttl(&self) -> bool {
        matches!(self, Tier::Instance)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
