//! Shared fixtures for contract integration tests

#![allow(dead_code)]

use std::rc::Rc;

use lib_contract::{ArgValue, Env, TokenConfig, TokenContract};
use lib_state::{ManualClock, TtlPolicy};
use lib_types::{Address, Amount, ContractId};

pub const CONTRACT: ContractId = ContractId([9u8; 32]);
pub const ADMIN: Address = Address([1u8; 32]);
pub const ALICE: Address = Address([2u8; 32]);
pub const BOB: Address = Address([3u8; 32]);
pub const SPENDER: Address = Address([4u8; 32]);
pub const FEES: Address = Address([5u8; 32]);

pub const START_SEQUENCE: u64 = 1_000;

pub fn config() -> TokenConfig {
    TokenConfig::new("Example Token", "EXT", 7, FEES).with_upgrade_delay(10)
}

pub struct Harness {
    pub clock: Rc<ManualClock>,
    pub token: TokenContract,
}

impl Harness {
    /// Uninitialized contract
    pub fn new() -> Self {
        let clock = Rc::new(ManualClock::new(START_SEQUENCE, 1_700_000_000));
        let env = Env::in_memory(CONTRACT, clock.clone(), TtlPolicy::default());
        Self {
            clock,
            token: TokenContract::new(env),
        }
    }

    pub fn initialized(config: TokenConfig) -> Self {
        let mut harness = Self::new();
        let digest = config.digest().unwrap();
        harness.consent(ADMIN, "initialize", vec![ADMIN.into(), ArgValue::Hash(digest)]);
        harness.token.initialize(ADMIN, config).unwrap();
        harness
    }

    pub fn consent(&mut self, principal: Address, function: &str, args: Vec<ArgValue>) {
        self.token
            .env_mut()
            .authorize(principal, function, args)
            .unwrap();
    }

    pub fn mint(&mut self, to: Address, amount: Amount) {
        self.consent(ADMIN, "mint", vec![ADMIN.into(), to.into(), amount.into()]);
        self.token.mint(ADMIN, to, amount).unwrap();
    }

    pub fn consent_transfer(&mut self, from: Address, to: Address, amount: Amount) {
        self.consent(from, "transfer", vec![from.into(), to.into(), amount.into()]);
    }

    pub fn pause(&mut self) {
        self.consent(ADMIN, "pause", vec![ADMIN.into()]);
        self.token.pause(ADMIN).unwrap();
    }

    pub fn sequence(&self) -> u64 {
        self.token.env().sequence()
    }
}
