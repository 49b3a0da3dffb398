//! Contract data keys
//!
//! Every key the contract touches, with the tier it lives in. Encoding goes
//! through [`StorageKey`]; nothing else builds key bytes.

use lib_state::{StateResult, StorageKey, Tier};
use lib_types::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKey {
    /// Single-assignment initialization flag
    Initialized,
    Admin,
    Config,
    Paused,
    PendingUpgrade,
    WasmHash,
    Supply,
    Balance(Address),
    Allowance { owner: Address, spender: Address },
}

impl DataKey {
    pub fn tier(&self) -> Tier {
        match self {
            DataKey::Balance(_) => Tier::Persistent,
            DataKey::Allowance { .. } => Tier::Temporary,
            _ => Tier::Instance,
        }
    }

    pub fn storage_key(&self) -> StateResult<StorageKey> {
        match self {
            DataKey::Initialized => StorageKey::symbol("INIT"),
            DataKey::Admin => StorageKey::symbol("ADMIN"),
            DataKey::Config => StorageKey::symbol("CONFIG"),
            DataKey::Paused => StorageKey::symbol("PAUSED"),
            DataKey::PendingUpgrade => StorageKey::symbol("PENDING_UPGRADE"),
            DataKey::WasmHash => StorageKey::symbol("WASM_HASH"),
            DataKey::Supply => StorageKey::symbol("SUPPLY"),
            DataKey::Balance(addr) => StorageKey::with_address("BALANCE", addr),
            DataKey::Allowance { owner, spender } => {
                StorageKey::with_address_pair("ALLOWANCE", owner, spender)
            }
        }
    }
}
