//! State layer configuration
//!
//! Loaded from TOML. Every field has a default so an empty file is valid.
//!
//! ```toml
//! [ttl]
//! min_persistent_ttl = 4096
//! min_temporary_ttl = 16
//! min_instance_ttl = 4096
//! max_entry_ttl = 3110400
//! ```

use std::path::Path;

use lib_types::Sequence;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::tier::Tier;

/// Default minimum TTL for persistent entries, in ledgers
pub const DEFAULT_MIN_PERSISTENT_TTL: Sequence = 4_096;
/// Default minimum TTL for temporary entries, in ledgers
pub const DEFAULT_MIN_TEMPORARY_TTL: Sequence = 16;
/// Default minimum TTL for the instance namespace, in ledgers
pub const DEFAULT_MIN_INSTANCE_TTL: Sequence = 4_096;
/// Default ceiling on how far ahead any entry may be kept alive
pub const DEFAULT_MAX_ENTRY_TTL: Sequence = 3_110_400;

/// Per-tier TTL bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlPolicy {
    pub min_persistent_ttl: Sequence,
    pub min_temporary_ttl: Sequence,
    pub min_instance_ttl: Sequence,
    pub max_entry_ttl: Sequence,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            min_persistent_ttl: DEFAULT_MIN_PERSISTENT_TTL,
            min_temporary_ttl: DEFAULT_MIN_TEMPORARY_TTL,
            min_instance_ttl: DEFAULT_MIN_INSTANCE_TTL,
            max_entry_ttl: DEFAULT_MAX_ENTRY_TTL,
        }
    }
}

impl TtlPolicy {
    /// TTL stamped on a freshly written entry
    pub fn min_ttl(&self, tier: Tier) -> Sequence {
        match tier {
            Tier::Persistent => self.min_persistent_ttl,
            Tier::Temporary => self.min_temporary_ttl,
            Tier::Instance => self.min_instance_ttl,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in Tier::ALL {
            let min = self.min_ttl(tier);
            if min == 0 {
                return Err(ConfigError::Invalid(format!("min {} ttl must be > 0", tier)));
            }
            if min > self.max_entry_ttl {
                return Err(ConfigError::Invalid(format!(
                    "min {} ttl {} exceeds max_entry_ttl {}",
                    tier, min, self.max_entry_ttl
                )));
            }
        }
        Ok(())
    }
}

/// Top-level state configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StateConfig {
    pub ttl: TtlPolicy,
}

impl StateConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: StateConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ttl.validate()
    }
}
