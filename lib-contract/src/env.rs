//! Execution environment
//!
//! `Env` is the explicit "current contract" handle passed to every call: the
//! contract id, the host's ledger clock, tiered storage, the authorization
//! gate and the event log. One invocation runs to completion against it with
//! no interleaving, so it carries no locks and is `!Sync`. The host closes each
//! invocation with [`Env::end_invocation`], which drains the per-call records.

use std::rc::Rc;

use lib_state::{
    ExtendOutcome, LedgerClock, LedgerInfo, MemoryBackend, StateBackend, Storage, StorageKey, Tier,
    TtlPolicy,
};
use lib_types::{Address, ContractId, Sequence, Symbol, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{ArgValue, AuthManager, AuthorizedInvocation, Consent, InvocationContext};
use crate::errors::ContractResult;
use crate::events::{ContractEvent, EventLog};

/// What one invocation authorized and published
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationTrace {
    pub authorized: Vec<AuthorizedInvocation>,
    pub events: Vec<ContractEvent>,
}

pub struct Env<B: StateBackend = MemoryBackend> {
    contract_id: ContractId,
    clock: Rc<dyn LedgerClock>,
    storage: Storage<B>,
    auth: AuthManager,
    events: EventLog,
}

impl Env<MemoryBackend> {
    /// Environment over volatile storage
    pub fn in_memory(
        contract_id: ContractId,
        clock: Rc<dyn LedgerClock>,
        policy: TtlPolicy,
    ) -> Self {
        Self::new(contract_id, clock, Storage::in_memory(policy))
    }
}

impl<B: StateBackend> Env<B> {
    pub fn new(contract_id: ContractId, clock: Rc<dyn LedgerClock>, storage: Storage<B>) -> Self {
        Self {
            contract_id,
            clock,
            storage,
            auth: AuthManager::new(),
            events: EventLog::new(),
        }
    }

    pub fn contract_id(&self) -> ContractId {
        self.contract_id
    }

    pub fn sequence(&self) -> Sequence {
        self.clock.current_sequence()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.clock.current_timestamp()
    }

    pub fn ledger_info(&self) -> LedgerInfo {
        self.clock.ledger_info()
    }

    pub fn storage(&self) -> &Storage<B> {
        &self.storage
    }

    /// Direct storage access for host maintenance such as eviction
    pub fn storage_mut(&mut self) -> &mut Storage<B> {
        &mut self.storage
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Close the current invocation. Unused consents are dropped; the
    /// authorization record and events are returned and cleared.
    pub fn end_invocation(&mut self) -> InvocationTrace {
        InvocationTrace {
            authorized: self.auth.finish(),
            events: self.events.take(),
        }
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Invocation of `function` on this contract
    pub fn invocation(
        &self,
        function: &str,
        args: Vec<ArgValue>,
    ) -> ContractResult<InvocationContext> {
        Ok(InvocationContext::new(self.contract_id, Symbol::new(function)?, args))
    }

    /// Accept a consent the host has already verified
    pub fn grant_consent(&mut self, consent: Consent) {
        self.auth.grant(consent);
    }

    /// Shorthand for granting `principal`'s consent to `function(args)` on
    /// this contract
    pub fn authorize(
        &mut self,
        principal: Address,
        function: &str,
        args: Vec<ArgValue>,
    ) -> ContractResult<()> {
        let invocation = self.invocation(function, args)?;
        self.auth.grant(Consent::new(principal, invocation));
        Ok(())
    }

    /// Fails with `Unauthorized` unless `principal` consented to exactly
    /// `function(args)`. Call before the first write.
    pub fn require_auth(
        &mut self,
        principal: &Address,
        function: &str,
        args: Vec<ArgValue>,
    ) -> ContractResult<()> {
        let invocation = self.invocation(function, args)?;
        let now = self.sequence();
        self.auth.require_auth(principal, &invocation, now)?;
        Ok(())
    }

    // =========================================================================
    // Typed storage
    // =========================================================================

    pub fn get<T: DeserializeOwned>(
        &self,
        tier: Tier,
        key: &StorageKey,
    ) -> ContractResult<Option<T>> {
        Ok(self.storage.get_value(tier, key, self.sequence())?)
    }

    pub fn set<T: Serialize>(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        value: &T,
    ) -> ContractResult<Sequence> {
        let now = self.sequence();
        Ok(self.storage.set_value(tier, key, value, now)?)
    }

    pub fn has(&self, tier: Tier, key: &StorageKey) -> ContractResult<bool> {
        Ok(self.storage.has(tier, key, self.sequence())?)
    }

    pub fn remove(&mut self, tier: Tier, key: &StorageKey) -> ContractResult<bool> {
        let now = self.sequence();
        Ok(self.storage.remove(tier, key, now)?)
    }

    pub fn live_until(&self, tier: Tier, key: &StorageKey) -> ContractResult<Option<Sequence>> {
        Ok(self.storage.live_until(tier, key, self.sequence())?)
    }

    pub fn extend_ttl(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        threshold: Sequence,
        extend_to: Sequence,
    ) -> ContractResult<ExtendOutcome> {
        let now = self.sequence();
        Ok(self.storage.extend_ttl(tier, key, threshold, extend_to, now)?)
    }

    /// Extend to an absolute deadline
    pub fn extend_ttl_to(
        &mut self,
        tier: Tier,
        key: &StorageKey,
        threshold: Sequence,
        live_until: Sequence,
    ) -> ContractResult<ExtendOutcome> {
        let now = self.sequence();
        Ok(self.storage.extend_ttl_to(tier, key, threshold, live_until, now)?)
    }

    pub fn extend_instance_ttl(
        &mut self,
        threshold: Sequence,
        extend_to: Sequence,
    ) -> ContractResult<ExtendOutcome> {
        let now = self.sequence();
        Ok(self.storage.extend_instance_ttl(threshold, extend_to, now)?)
    }

    pub fn is_instance_sealed(&self) -> ContractResult<bool> {
        Ok(self.storage.is_instance_sealed()?)
    }

    pub fn is_instance_archived(&self) -> ContractResult<bool> {
        Ok(self.storage.is_instance_archived(self.sequence())?)
    }

    pub fn seal_instance(&mut self) -> ContractResult<()> {
        Ok(self.storage.seal_instance()?)
    }

    pub fn restore_instance(&mut self) -> ContractResult<ExtendOutcome> {
        let now = self.sequence();
        Ok(self.storage.restore_instance(now)?)
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn publish(
        &mut self,
        name: &str,
        mut topics: Vec<ArgValue>,
        data: Vec<ArgValue>,
    ) -> ContractResult<()> {
        topics.insert(0, ArgValue::Symbol(Symbol::new(name)?));
        let event = ContractEvent {
            contract: self.contract_id,
            sequence: self.sequence(),
            topics,
            data,
        };
        self.events.publish(event);
        Ok(())
    }
}
