//! Ledger Clock
//!
//! The state layer never reads wall time. Every TTL decision is made against a
//! ledger sequence number supplied by the host through [`LedgerClock`].

use std::cell::Cell;

use lib_types::{Sequence, Timestamp};
use serde::{Deserialize, Serialize};

use crate::errors::{StateError, StateResult};

/// Read-only source of ledger sequence and close time
pub trait LedgerClock {
    /// Current ledger sequence number
    fn current_sequence(&self) -> Sequence;

    /// Current ledger close time
    fn current_timestamp(&self) -> Timestamp;

    /// Snapshot both values for one invocation
    fn ledger_info(&self) -> LedgerInfo {
        LedgerInfo {
            sequence: self.current_sequence(),
            timestamp: self.current_timestamp(),
        }
    }
}

/// Ledger position captured once at the start of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LedgerInfo {
    pub sequence: Sequence,
    pub timestamp: Timestamp,
}

impl LedgerClock for LedgerInfo {
    fn current_sequence(&self) -> Sequence {
        self.sequence
    }

    fn current_timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// Host-driven clock.
///
/// Interior mutability lets the host advance the ledger while contracts hold a
/// shared handle. Single-threaded by construction (`Cell` is `!Sync`).
#[derive(Debug)]
pub struct ManualClock {
    sequence: Cell<Sequence>,
    timestamp: Cell<Timestamp>,
    /// Seconds added to the timestamp per sequence step
    close_interval: Timestamp,
}

impl ManualClock {
    /// Default ledger close interval in seconds
    pub const DEFAULT_CLOSE_INTERVAL: Timestamp = 5;

    pub fn new(sequence: Sequence, timestamp: Timestamp) -> Self {
        Self {
            sequence: Cell::new(sequence),
            timestamp: Cell::new(timestamp),
            close_interval: Self::DEFAULT_CLOSE_INTERVAL,
        }
    }

    /// Override the seconds-per-ledger used by [`advance`](Self::advance)
    pub fn with_close_interval(mut self, seconds: Timestamp) -> Self {
        self.close_interval = seconds;
        self
    }

    /// Close `ledgers` more ledgers
    pub fn advance(&self, ledgers: u64) -> StateResult<Sequence> {
        let target = self
            .sequence
            .get()
            .checked_add(ledgers)
            .ok_or_else(|| StateError::Clock("sequence overflow".to_string()))?;
        self.advance_to(target)
    }

    /// Jump to `sequence`. The ledger never moves backwards.
    pub fn advance_to(&self, sequence: Sequence) -> StateResult<Sequence> {
        let current = self.sequence.get();
        if sequence < current {
            return Err(StateError::Clock(format!(
                "cannot move ledger backwards: {} -> {}",
                current, sequence
            )));
        }
        let elapsed = (sequence - current).saturating_mul(self.close_interval);
        self.timestamp.set(self.timestamp.get().saturating_add(elapsed));
        self.sequence.set(sequence);
        Ok(sequence)
    }
}

impl LedgerClock for ManualClock {
    fn current_sequence(&self) -> Sequence {
        self.sequence.get()
    }

    fn current_timestamp(&self) -> Timestamp {
        self.timestamp.get()
    }
}
