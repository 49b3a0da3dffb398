//! Instance lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Active <--pause/unpause--> Paused
//!                                 |  propose_upgrade / execute_upgrade
//!                                 +--> (same state, new code hash)
//!
//! Active/Paused --instance TTL lapses--> Archived --restore_instance--> Active/Paused
//! ```
//!
//! `initialize` seals the instance. The seal is kept outside the expiring
//! namespace, so an archived instance can never be initialized again.
//!
//! Every admin operation checks authorization before reading the stored
//! admin, and both before any write. Upgrades are two-phase: a proposal
//! unlocks `upgrade_delay` ledgers after it is made and can be executed once.

use lib_state::{ExtendOutcome, StateBackend};
use lib_types::{Address, Sequence, WasmHash};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{ArgValue, AuthError};
use crate::config::TokenConfig;
use crate::errors::{ContractError, ContractResult};
use crate::keys::DataKey;
use crate::token::TokenContract;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractState {
    Uninitialized,
    Active,
    Paused,
    /// Initialized once, but the instance namespace has expired
    Archived,
}

/// Upgrade waiting out its timelock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpgrade {
    pub new_hash: WasmHash,
    pub proposed_at: Sequence,
    pub unlock_sequence: Sequence,
}

impl<B: StateBackend> TokenContract<B> {
    // =========================================================================
    // Initialization
    // =========================================================================

    /// One-time setup. `admin` must authorize `(admin, config digest)` and
    /// becomes the admin.
    pub fn initialize(&mut self, admin: Address, config: TokenConfig) -> ContractResult<()> {
        if self.env.is_instance_sealed()? {
            return Err(ContractError::AlreadyInitialized);
        }
        if admin.is_zero() {
            return Err(ContractError::InvalidConfiguration(
                "admin is the zero address".into(),
            ));
        }
        config.validate()?;
        let digest = config.digest()?;

        self.env
            .require_auth(&admin, "initialize", vec![admin.into(), ArgValue::Hash(digest)])?;

        self.write(DataKey::Config, &config)?;
        self.write(DataKey::Admin, &admin)?;
        self.write(DataKey::Paused, &false)?;
        self.write(DataKey::Supply, &0i128)?;
        self.write(DataKey::Initialized, &true)?;
        self.env.seal_instance()?;
        self.bump_instance(&config)?;

        self.env.publish("initialized", vec![admin.into()], vec![])?;
        info!(
            contract = %self.env.contract_id(),
            %admin,
            symbol = %config.symbol,
            "contract initialized"
        );
        Ok(())
    }

    /// True once `initialize` has succeeded, whether or not the instance is
    /// still live
    pub fn is_initialized(&self) -> ContractResult<bool> {
        self.env.is_instance_sealed()
    }

    /// Initialized and the instance namespace is live
    fn require_live(&self) -> ContractResult<()> {
        if !self.is_initialized()? {
            return Err(ContractError::NotInitialized);
        }
        if !self.read::<bool>(DataKey::Initialized)?.unwrap_or(false) {
            return Err(ContractError::InstanceArchived);
        }
        Ok(())
    }

    pub fn state(&self) -> ContractResult<ContractState> {
        match self.require_live() {
            Ok(()) => {}
            Err(ContractError::NotInitialized) => return Ok(ContractState::Uninitialized),
            Err(ContractError::InstanceArchived) => return Ok(ContractState::Archived),
            Err(err) => return Err(err),
        }
        if self.read::<bool>(DataKey::Paused)?.unwrap_or(false) {
            Ok(ContractState::Paused)
        } else {
            Ok(ContractState::Active)
        }
    }

    /// Stored config of an initialized instance
    pub fn config(&self) -> ContractResult<TokenConfig> {
        self.require_live()?;
        self.read(DataKey::Config)?
            .ok_or_else(|| ContractError::KeyNotFound("CONFIG".into()))
    }

    pub fn admin(&self) -> ContractResult<Address> {
        self.require_live()?;
        self.read(DataKey::Admin)?
            .ok_or_else(|| ContractError::KeyNotFound("ADMIN".into()))
    }

    /// Config of an initialized, unpaused instance
    pub(crate) fn ensure_active(&self) -> ContractResult<TokenConfig> {
        let config = self.config()?;
        if self.read::<bool>(DataKey::Paused)?.unwrap_or(false) {
            return Err(ContractError::ContractPaused);
        }
        Ok(config)
    }

    /// Called after authorization: `caller` must be the stored admin
    pub(crate) fn require_admin(&self, caller: &Address) -> ContractResult<()> {
        if self.admin()? != *caller {
            return Err(AuthError::NotAdmin { caller: *caller }.into());
        }
        Ok(())
    }

    pub(crate) fn bump_instance(&mut self, config: &TokenConfig) -> ContractResult<ExtendOutcome> {
        self.env
            .extend_instance_ttl(config.ttl.instance_threshold, config.ttl.instance_extend_to)
    }

    /// Keep the instance namespace alive. Needs no authorization.
    pub fn extend_instance(&mut self) -> ContractResult<ExtendOutcome> {
        let config = self.config()?;
        self.bump_instance(&config)
    }

    /// Revive an archived instance and extend it to the configured TTL. Like
    /// `extend_instance` it needs no authorization. Fails with
    /// `InstanceArchived` once the archived entries have been evicted.
    pub fn restore_instance(&mut self) -> ContractResult<ExtendOutcome> {
        if !self.is_initialized()? {
            return Err(ContractError::NotInitialized);
        }
        if let ExtendOutcome::Missing = self.env.restore_instance()? {
            return Err(ContractError::InstanceArchived);
        }
        let config = self.config()?;
        let outcome = self.bump_instance(&config)?;
        info!(live_until = ?outcome.live_until(), "instance restored");
        Ok(outcome)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    pub fn set_admin(&mut self, caller: Address, new_admin: Address) -> ContractResult<()> {
        let config = self.config()?;
        if new_admin.is_zero() {
            return Err(ContractError::InvalidConfiguration(
                "admin is the zero address".into(),
            ));
        }

        self.env
            .require_auth(&caller, "set_admin", vec![caller.into(), new_admin.into()])?;
        self.require_admin(&caller)?;

        self.write(DataKey::Admin, &new_admin)?;
        self.bump_instance(&config)?;

        self.env
            .publish("set_admin", vec![caller.into()], vec![new_admin.into()])?;
        info!(old = %caller, new = %new_admin, "admin changed");
        Ok(())
    }

    pub fn pause(&mut self, caller: Address) -> ContractResult<()> {
        self.set_paused(caller, true)
    }

    pub fn unpause(&mut self, caller: Address) -> ContractResult<()> {
        self.set_paused(caller, false)
    }

    fn set_paused(&mut self, caller: Address, paused: bool) -> ContractResult<()> {
        let config = self.config()?;
        let function = if paused { "pause" } else { "unpause" };

        self.env.require_auth(&caller, function, vec![caller.into()])?;
        self.require_admin(&caller)?;

        self.write(DataKey::Paused, &paused)?;
        self.bump_instance(&config)?;

        self.env.publish(function, vec![caller.into()], vec![])?;
        info!(%caller, paused, "pause flag changed");
        Ok(())
    }

    // =========================================================================
    // Upgrades
    // =========================================================================

    pub fn pending_upgrade(&self) -> ContractResult<Option<PendingUpgrade>> {
        self.read(DataKey::PendingUpgrade)
    }

    /// Code hash installed by the last executed upgrade
    pub fn current_wasm_hash(&self) -> ContractResult<Option<WasmHash>> {
        self.read(DataKey::WasmHash)
    }

    /// Start the timelock. A new proposal replaces any pending one.
    pub fn propose_upgrade(
        &mut self,
        admin: Address,
        new_hash: WasmHash,
    ) -> ContractResult<PendingUpgrade> {
        let config = self.config()?;
        if new_hash.is_zero() {
            return Err(ContractError::InvalidConfiguration("upgrade hash is zero".into()));
        }

        self.env
            .require_auth(&admin, "propose_upgrade", vec![admin.into(), new_hash.into()])?;
        self.require_admin(&admin)?;

        let now = self.env.sequence();
        let unlock_sequence = now
            .checked_add(config.upgrade_delay)
            .ok_or(ContractError::Overflow)?;
        let pending = PendingUpgrade {
            new_hash,
            proposed_at: now,
            unlock_sequence,
        };

        self.write(DataKey::PendingUpgrade, &pending)?;
        self.bump_instance(&config)?;

        self.env.publish(
            "upgrade_proposed",
            vec![admin.into()],
            vec![new_hash.into(), unlock_sequence.into()],
        )?;
        info!(%admin, hash = %new_hash, unlock_sequence, "upgrade proposed");
        Ok(pending)
    }

    /// Install the pending hash once its timelock has passed
    pub fn execute_upgrade(&mut self, admin: Address) -> ContractResult<WasmHash> {
        let config = self.config()?;

        self.env.require_auth(&admin, "execute_upgrade", vec![admin.into()])?;
        self.require_admin(&admin)?;

        let pending = self.pending_upgrade()?.ok_or(ContractError::NoPendingUpgrade)?;
        let now = self.env.sequence();
        if now < pending.unlock_sequence {
            return Err(ContractError::TimelockNotExpired {
                unlock_sequence: pending.unlock_sequence,
                now,
            });
        }

        self.write(DataKey::WasmHash, &pending.new_hash)?;
        self.delete(DataKey::PendingUpgrade)?;
        self.bump_instance(&config)?;

        self.env.publish("upgraded", vec![admin.into()], vec![pending.new_hash.into()])?;
        info!(%admin, hash = %pending.new_hash, "upgrade executed");
        Ok(pending.new_hash)
    }

    pub fn cancel_upgrade(&mut self, admin: Address) -> ContractResult<()> {
        let config = self.config()?;

        self.env.require_auth(&admin, "cancel_upgrade", vec![admin.into()])?;
        self.require_admin(&admin)?;

        let pending = self.pending_upgrade()?.ok_or(ContractError::NoPendingUpgrade)?;

        self.delete(DataKey::PendingUpgrade)?;
        self.bump_instance(&config)?;

        self.env.publish(
            "upgrade_cancelled",
            vec![admin.into()],
            vec![pending.new_hash.into()],
        )?;
        info!(%admin, hash = %pending.new_hash, "upgrade cancelled");
        Ok(())
    }
}
