//! Token configuration
//!
//! Validated once at `initialize` and stored in the Instance tier. Also
//! loadable from TOML for hosts that deploy from a config file:
//!
//! ```toml
//! name = "Example Token"
//! symbol = "EXT"
//! decimals = 7
//! fee_recipient = "0303030303030303030303030303030303030303030303030303030303030303"
//! transfer_fee_bps = 25
//! upgrade_delay = 17280
//!
//! [ttl]
//! balance_threshold = 501120
//! balance_extend_to = 518400
//! ```

use std::path::Path;

use lib_state::ConfigError;
use lib_types::{Address, Bps, Sequence, Symbol};
use serde::{Deserialize, Serialize};

use crate::accounting::validate_bps;
use crate::errors::{ContractError, ContractResult};

/// Ledgers closed per day at a 5 second close interval
pub const DAY_IN_LEDGERS: Sequence = 17_280;

pub const DEFAULT_INSTANCE_EXTEND_TO: Sequence = 7 * DAY_IN_LEDGERS;
pub const DEFAULT_INSTANCE_THRESHOLD: Sequence = DEFAULT_INSTANCE_EXTEND_TO - DAY_IN_LEDGERS;
pub const DEFAULT_BALANCE_EXTEND_TO: Sequence = 30 * DAY_IN_LEDGERS;
pub const DEFAULT_BALANCE_THRESHOLD: Sequence = DEFAULT_BALANCE_EXTEND_TO - DAY_IN_LEDGERS;
pub const DEFAULT_UPGRADE_DELAY: Sequence = DAY_IN_LEDGERS;

/// Largest supported display precision
pub const MAX_DECIMALS: u8 = 18;

/// Threshold/target pairs used when a call extends the entries it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlSettings {
    pub instance_threshold: Sequence,
    pub instance_extend_to: Sequence,
    pub balance_threshold: Sequence,
    pub balance_extend_to: Sequence,
}

impl Default for TtlSettings {
    fn default() -> Self {
        Self {
            instance_threshold: DEFAULT_INSTANCE_THRESHOLD,
            instance_extend_to: DEFAULT_INSTANCE_EXTEND_TO,
            balance_threshold: DEFAULT_BALANCE_THRESHOLD,
            balance_extend_to: DEFAULT_BALANCE_EXTEND_TO,
        }
    }
}

impl TtlSettings {
    pub fn validate(&self) -> ContractResult<()> {
        for (name, threshold, extend_to) in [
            ("instance", self.instance_threshold, self.instance_extend_to),
            ("balance", self.balance_threshold, self.balance_extend_to),
        ] {
            if extend_to == 0 {
                return Err(ContractError::InvalidConfiguration(format!(
                    "{} extend_to must be > 0",
                    name
                )));
            }
            if threshold > extend_to {
                return Err(ContractError::InvalidConfiguration(format!(
                    "{} threshold {} exceeds extend_to {}",
                    name, threshold, extend_to
                )));
            }
        }
        Ok(())
    }
}

/// Immutable token parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    /// Receives transfer fees
    #[serde(with = "hex_address")]
    pub fee_recipient: Address,
    #[serde(default)]
    pub transfer_fee_bps: Bps,
    /// Minimum ledgers between `propose_upgrade` and `execute_upgrade`
    #[serde(default = "default_upgrade_delay")]
    pub upgrade_delay: Sequence,
    #[serde(default)]
    pub ttl: TtlSettings,
}

fn default_upgrade_delay() -> Sequence {
    DEFAULT_UPGRADE_DELAY
}

impl TokenConfig {
    pub fn new(name: &str, symbol: &str, decimals: u8, fee_recipient: Address) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            fee_recipient,
            transfer_fee_bps: 0,
            upgrade_delay: DEFAULT_UPGRADE_DELAY,
            ttl: TtlSettings::default(),
        }
    }

    pub fn with_transfer_fee(mut self, bps: Bps) -> Self {
        self.transfer_fee_bps = bps;
        self
    }

    pub fn with_upgrade_delay(mut self, delay: Sequence) -> Self {
        self.upgrade_delay = delay;
        self
    }

    pub fn with_ttl(mut self, ttl: TtlSettings) -> Self {
        self.ttl = ttl;
        self
    }

    /// Numeric bounds and required addresses
    pub fn validate(&self) -> ContractResult<()> {
        if self.name.trim().is_empty() {
            return Err(ContractError::InvalidConfiguration("name is empty".into()));
        }
        Symbol::new(&self.symbol)?;
        if self.decimals > MAX_DECIMALS {
            return Err(ContractError::InvalidConfiguration(format!(
                "decimals {} exceeds {}",
                self.decimals, MAX_DECIMALS
            )));
        }
        if self.fee_recipient.is_zero() {
            return Err(ContractError::InvalidConfiguration(
                "fee recipient is the zero address".into(),
            ));
        }
        validate_bps(self.transfer_fee_bps)?;
        if self.upgrade_delay == 0 {
            return Err(ContractError::InvalidConfiguration(
                "upgrade delay must be > 0".into(),
            ));
        }
        self.ttl.validate()
    }

    /// Canonical digest, bound into the `initialize` authorization
    pub fn digest(&self) -> ContractResult<[u8; 32]> {
        let bytes = bincode::serialize(self).map_err(lib_state::StateError::from)?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: TokenConfig = toml::from_str(s)?;
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

/// Addresses as 64-char hex strings in config files
mod hex_address {
    use lib_types::Address;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(addr: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(addr.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        let raw: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            serde::de::Error::custom(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Address(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEES: Address = Address([3u8; 32]);

    fn config() -> TokenConfig {
        TokenConfig::new("Example Token", "EXT", 7, FEES)
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
        assert!(config().with_transfer_fee(10_000).validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let cases = vec![
            TokenConfig::new("", "EXT", 7, FEES),
            TokenConfig::new("Token", "E-X", 7, FEES),
            TokenConfig::new("Token", "EXT", 19, FEES),
            TokenConfig::new("Token", "EXT", 7, Address::ZERO),
            config().with_transfer_fee(10_001),
            config().with_upgrade_delay(0),
            config().with_ttl(TtlSettings {
                balance_threshold: 10,
                balance_extend_to: 5,
                ..TtlSettings::default()
            }),
        ];
        for case in cases {
            assert!(
                matches!(case.validate(), Err(ContractError::InvalidConfiguration(_))),
                "{:?} should be rejected",
                case
            );
        }
    }

    #[test]
    fn test_default_ttl_fits_default_ceiling() {
        let ttl = TtlSettings::default();
        assert!(ttl.balance_extend_to <= lib_state::config::DEFAULT_MAX_ENTRY_TTL);
        assert!(ttl.instance_extend_to <= lib_state::config::DEFAULT_MAX_ENTRY_TTL);
    }

    #[test]
    fn test_toml_roundtrip() {
        let original = config().with_transfer_fee(25);
        let text = toml::to_string(&original).unwrap();
        assert!(text.contains(&hex::encode([3u8; 32])));
        let parsed = TokenConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_toml_defaults_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.toml");
        std::fs::write(
            &path,
            format!(
                "name = \"T\"\nsymbol = \"T\"\nfee_recipient = \"{}\"\n",
                hex::encode([3u8; 32])
            ),
        )
        .unwrap();
        let parsed = TokenConfig::from_file(&path).unwrap();
        assert_eq!(parsed.upgrade_delay, DEFAULT_UPGRADE_DELAY);
        assert_eq!(parsed.ttl, TtlSettings::default());
    }

    #[test]
    fn test_toml_invalid_config_rejected() {
        let text = format!(
            "name = \"T\"\nsymbol = \"T\"\nfee_recipient = \"{}\"\ntransfer_fee_bps = 20000\n",
            hex::encode([3u8; 32])
        );
        assert!(matches!(TokenConfig::from_toml_str(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_digest_changes_with_config() {
        assert_eq!(config().digest().unwrap(), config().digest().unwrap());
        assert_ne!(
            config().digest().unwrap(),
            config().with_transfer_fee(1).digest().unwrap()
        );
    }
}
