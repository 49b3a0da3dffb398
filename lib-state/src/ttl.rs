//! TTL Manager
//!
//! Computes and enforces entry lifetimes. A TTL is a ledger sequence deadline:
//! an entry with `live_until = L` is readable while `current_sequence <= L` and
//! absent from `L + 1` onward.
//!
//! # Extension rule
//!
//! `extend(threshold, new_live_until)` only writes when the remaining lifetime
//! `live_until - current_sequence` is below `threshold`, and never shortens:
//! the result is `max(live_until, new_live_until)`, capped at
//! `current_sequence + max_entry_ttl`. A caller that extends on every write
//! with a fixed threshold/target pair keeps data alive indefinitely while
//! skipping most redundant writes.

use lib_types::Sequence;
use serde::{Deserialize, Serialize};

use crate::config::TtlPolicy;
use crate::tier::Tier;

/// Result of an extension request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendOutcome {
    /// `live_until` moved forward
    Extended { from: Sequence, to: Sequence },
    /// Remaining lifetime was at or above the threshold, or the target was not
    /// beyond the current deadline
    Unchanged { live_until: Sequence },
    /// Nothing live to extend; no entry is created
    Missing,
}

impl ExtendOutcome {
    pub fn is_extended(&self) -> bool {
        matches!(self, ExtendOutcome::Extended { .. })
    }

    /// Deadline after the request, if the entry is live
    pub fn live_until(&self) -> Option<Sequence> {
        match self {
            ExtendOutcome::Extended { to, .. } => Some(*to),
            ExtendOutcome::Unchanged { live_until } => Some(*live_until),
            ExtendOutcome::Missing => None,
        }
    }
}

/// Lifetime policy engine, one per storage instance
#[derive(Debug, Clone, Default)]
pub struct TtlManager {
    policy: TtlPolicy,
}

impl TtlManager {
    pub fn new(policy: TtlPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    /// An entry with no TTL record is treated exactly like an expired one
    pub fn is_expired(live_until: Option<Sequence>, now: Sequence) -> bool {
        match live_until {
            Some(deadline) => now > deadline,
            None => true,
        }
    }

    /// Furthest deadline any entry may hold at `now`
    pub fn max_live_until(&self, now: Sequence) -> Sequence {
        now.saturating_add(self.policy.max_entry_ttl)
    }

    /// Deadline stamped on a write. A still-live entry keeps its later
    /// deadline; an expired or new entry starts from the tier minimum.
    pub fn stamp_on_write(
        &self,
        tier: Tier,
        existing: Option<Sequence>,
        now: Sequence,
    ) -> Sequence {
        let minimum = now.saturating_add(self.policy.min_ttl(tier));
        match existing {
            Some(deadline) if !Self::is_expired(Some(deadline), now) => deadline.max(minimum),
            _ => minimum,
        }
    }

    /// Apply the threshold rule with an absolute target deadline
    pub fn extend(
        &self,
        current: Option<Sequence>,
        now: Sequence,
        threshold: Sequence,
        new_live_until: Sequence,
    ) -> ExtendOutcome {
        let deadline = match current {
            Some(deadline) if !Self::is_expired(Some(deadline), now) => deadline,
            _ => return ExtendOutcome::Missing,
        };

        let remaining = deadline - now;
        if remaining >= threshold {
            return ExtendOutcome::Unchanged { live_until: deadline };
        }

        let target = new_live_until.min(self.max_live_until(now));
        if target <= deadline {
            return ExtendOutcome::Unchanged { live_until: deadline };
        }

        ExtendOutcome::Extended {
            from: deadline,
            to: target,
        }
    }

    /// Apply the threshold rule with a target relative to `now`
    pub fn extend_by(
        &self,
        current: Option<Sequence>,
        now: Sequence,
        threshold: Sequence,
        extend_to: Sequence,
    ) -> ExtendOutcome {
        self.extend(current, now, threshold, now.saturating_add(extend_to))
    }
}
