//! Token Contract
//!
//! Balances, allowances and supply on top of [`Env`].
//!
//! # Storage layout
//!
//! | Data | Tier | Key |
//! |------|------|-----|
//! | balance | Persistent | `("BALANCE", address)` |
//! | allowance | Temporary | `("ALLOWANCE", owner, spender)` |
//! | supply, config, admin, flags | Instance | `"SUPPLY"`, `"CONFIG"`, ... |
//!
//! # Enforcement order
//!
//! Every mutating call runs: initialized, paused, amount, authorization,
//! then every read and checked computation, and only then the writes. A
//! rejected call leaves storage exactly as it was.

use std::collections::BTreeMap;

use lib_state::{MemoryBackend, StateBackend, Tier};
use lib_types::{Address, Amount, Sequence};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accounting::{checked_add, checked_sub, fee_for, require_non_negative, Rounding};
use crate::config::TokenConfig;
use crate::env::Env;
use crate::errors::{ContractError, ContractResult};
use crate::keys::DataKey;

/// Stored allowance. Reads as zero once `expiration_sequence` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceValue {
    pub amount: Amount,
    pub expiration_sequence: Sequence,
}

/// Result of a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    pub fee: Amount,
    /// `amount + fee`
    pub debited: Amount,
}

/// Staged balance updates, validated in full before any is written
#[derive(Debug, Default)]
struct BalanceBatch {
    staged: BTreeMap<Address, Amount>,
}

impl BalanceBatch {
    fn current<B: StateBackend>(
        &self,
        token: &TokenContract<B>,
        addr: Address,
    ) -> ContractResult<Amount> {
        match self.staged.get(&addr) {
            Some(balance) => Ok(*balance),
            None => token.balance(addr),
        }
    }

    fn debit<B: StateBackend>(
        &mut self,
        token: &TokenContract<B>,
        addr: Address,
        amount: Amount,
    ) -> ContractResult<()> {
        let have = self.current(token, addr)?;
        if have < amount {
            return Err(ContractError::InsufficientBalance { have, need: amount });
        }
        self.staged.insert(addr, checked_sub(have, amount)?);
        Ok(())
    }

    fn credit<B: StateBackend>(
        &mut self,
        token: &TokenContract<B>,
        addr: Address,
        amount: Amount,
    ) -> ContractResult<()> {
        let have = self.current(token, addr)?;
        self.staged.insert(addr, checked_add(have, amount)?);
        Ok(())
    }
}

/// Token façade over one contract instance
pub struct TokenContract<B: StateBackend = MemoryBackend> {
    pub(crate) env: Env<B>,
}

impl<B: StateBackend> TokenContract<B> {
    pub fn new(env: Env<B>) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Env<B> {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env<B> {
        &mut self.env
    }

    pub fn into_env(self) -> Env<B> {
        self.env
    }

    // =========================================================================
    // Storage helpers
    // =========================================================================

    pub(crate) fn read<T: DeserializeOwned>(&self, key: DataKey) -> ContractResult<Option<T>> {
        let storage_key = key.storage_key()?;
        self.env.get(key.tier(), &storage_key)
    }

    pub(crate) fn write<T: Serialize>(
        &mut self,
        key: DataKey,
        value: &T,
    ) -> ContractResult<Sequence> {
        let storage_key = key.storage_key()?;
        self.env.set(key.tier(), &storage_key, value)
    }

    pub(crate) fn delete(&mut self, key: DataKey) -> ContractResult<bool> {
        let storage_key = key.storage_key()?;
        self.env.remove(key.tier(), &storage_key)
    }

    fn commit_balances(&mut self, batch: BalanceBatch, config: &TokenConfig) -> ContractResult<()> {
        for (addr, balance) in batch.staged {
            let key = DataKey::Balance(addr);
            self.write(key, &balance)?;
            let storage_key = key.storage_key()?;
            self.env.extend_ttl(
                Tier::Persistent,
                &storage_key,
                config.ttl.balance_threshold,
                config.ttl.balance_extend_to,
            )?;
        }
        Ok(())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Balance of `addr`; absent or expired reads as zero
    pub fn balance(&self, addr: Address) -> ContractResult<Amount> {
        Ok(self.read::<Amount>(DataKey::Balance(addr))?.unwrap_or(0))
    }

    /// Zero before initialization. An archived supply is unreadable until the
    /// instance is restored.
    pub fn total_supply(&self) -> ContractResult<Amount> {
        if self.env.is_instance_archived()? {
            return Err(ContractError::InstanceArchived);
        }
        Ok(self.read::<Amount>(DataKey::Supply)?.unwrap_or(0))
    }

    /// Spendable allowance; zero once expired
    pub fn allowance(&self, owner: Address, spender: Address) -> ContractResult<Amount> {
        Ok(self.live_allowance(owner, spender)?.map_or(0, |a| a.amount))
    }

    fn live_allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> ContractResult<Option<AllowanceValue>> {
        let stored: Option<AllowanceValue> = self.read(DataKey::Allowance { owner, spender })?;
        let now = self.env.sequence();
        Ok(stored.filter(|a| a.expiration_sequence >= now))
    }

    fn require_allowance(
        &self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> ContractResult<AllowanceValue> {
        let current = self.live_allowance(owner, spender)?;
        let have = current.map_or(0, |a| a.amount);
        if have < amount {
            return Err(ContractError::InsufficientAllowance { have, need: amount });
        }
        let remaining = checked_sub(have, amount)?;
        Ok(AllowanceValue {
            amount: remaining,
            expiration_sequence: current.map_or(0, |a| a.expiration_sequence),
        })
    }

    fn store_spent_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        spent: Amount,
        remaining: AllowanceValue,
    ) -> ContractResult<()> {
        if spent > 0 {
            self.write(DataKey::Allowance { owner, spender }, &remaining)?;
        }
        Ok(())
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Fee, debit and the staged balances for moving `amount` from `from`
    fn plan_transfer(
        &self,
        config: &TokenConfig,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ContractResult<(BalanceBatch, TransferReceipt)> {
        let fee = fee_for(amount, config.transfer_fee_bps, Rounding::Floor)?;
        let debited = checked_add(amount, fee)?;

        let mut batch = BalanceBatch::default();
        batch.debit(self, from, debited)?;
        batch.credit(self, to, amount)?;
        if fee > 0 {
            batch.credit(self, config.fee_recipient, fee)?;
        }

        Ok((
            batch,
            TransferReceipt {
                from,
                to,
                amount,
                fee,
                debited,
            },
        ))
    }

    fn finish_transfer(
        &mut self,
        config: &TokenConfig,
        batch: BalanceBatch,
        receipt: TransferReceipt,
    ) -> ContractResult<TransferReceipt> {
        self.commit_balances(batch, config)?;
        self.bump_instance(config)?;
        self.env.publish(
            "transfer",
            vec![receipt.from.into(), receipt.to.into()],
            vec![receipt.amount.into(), receipt.fee.into()],
        )?;
        debug!(
            from = %receipt.from,
            to = %receipt.to,
            amount = receipt.amount,
            fee = receipt.fee,
            "transfer"
        );
        Ok(receipt)
    }

    /// Move `amount` from `from` to `to`. `from` authorizes and pays the fee.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ContractResult<TransferReceipt> {
        let config = self.ensure_active()?;
        require_non_negative(amount)?;
        self.env
            .require_auth(&from, "transfer", vec![from.into(), to.into(), amount.into()])?;

        let (batch, receipt) = self.plan_transfer(&config, from, to, amount)?;
        self.finish_transfer(&config, batch, receipt)
    }

    /// Move `amount` from `from` to `to` on `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> ContractResult<TransferReceipt> {
        let config = self.ensure_active()?;
        require_non_negative(amount)?;
        self.env.require_auth(
            &spender,
            "transfer_from",
            vec![spender.into(), from.into(), to.into(), amount.into()],
        )?;

        let remaining = self.require_allowance(from, spender, amount)?;
        let (batch, receipt) = self.plan_transfer(&config, from, to, amount)?;

        self.store_spent_allowance(from, spender, amount, remaining)?;
        self.finish_transfer(&config, batch, receipt)
    }

    // =========================================================================
    // Allowances
    // =========================================================================

    /// Let `spender` move up to `amount` of `owner`'s balance until
    /// `expiration_sequence`. A zero amount revokes.
    pub fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        amount: Amount,
        expiration_sequence: Sequence,
    ) -> ContractResult<()> {
        let config = self.config()?;
        require_non_negative(amount)?;

        let now = self.env.sequence();
        if amount > 0 {
            if expiration_sequence < now {
                return Err(ContractError::InvalidAmount(format!(
                    "expiration {} is before current sequence {}",
                    expiration_sequence, now
                )));
            }
            let ceiling = self.env.storage().ttl_manager().max_live_until(now);
            if expiration_sequence > ceiling {
                return Err(ContractError::InvalidAmount(format!(
                    "expiration {} is beyond the maximum {}",
                    expiration_sequence, ceiling
                )));
            }
        }

        self.env.require_auth(
            &owner,
            "approve",
            vec![
                owner.into(),
                spender.into(),
                amount.into(),
                expiration_sequence.into(),
            ],
        )?;

        let key = DataKey::Allowance { owner, spender };
        if amount == 0 {
            self.delete(key)?;
        } else {
            let value = AllowanceValue {
                amount,
                expiration_sequence,
            };
            self.write(key, &value)?;
            let storage_key = key.storage_key()?;
            self.env
                .extend_ttl_to(Tier::Temporary, &storage_key, Sequence::MAX, expiration_sequence)?;
        }
        self.bump_instance(&config)?;

        self.env.publish(
            "approve",
            vec![owner.into(), spender.into()],
            vec![amount.into(), expiration_sequence.into()],
        )?;
        debug!(%owner, %spender, amount, expiration_sequence, "approve");
        Ok(())
    }

    // =========================================================================
    // Supply
    // =========================================================================

    /// Create `amount` new tokens for `to`. Admin only.
    pub fn mint(&mut self, admin: Address, to: Address, amount: Amount) -> ContractResult<()> {
        let config = self.ensure_active()?;
        require_non_negative(amount)?;
        self.env
            .require_auth(&admin, "mint", vec![admin.into(), to.into(), amount.into()])?;
        self.require_admin(&admin)?;

        let mut batch = BalanceBatch::default();
        batch.credit(self, to, amount)?;
        let supply = checked_add(self.total_supply()?, amount)?;

        self.commit_balances(batch, &config)?;
        self.write(DataKey::Supply, &supply)?;
        self.bump_instance(&config)?;

        self.env
            .publish("mint", vec![admin.into(), to.into()], vec![amount.into()])?;
        debug!(%to, amount, supply, "mint");
        Ok(())
    }

    /// Destroy `amount` of `from`'s tokens
    pub fn burn(&mut self, from: Address, amount: Amount) -> ContractResult<()> {
        let config = self.ensure_active()?;
        require_non_negative(amount)?;
        self.env
            .require_auth(&from, "burn", vec![from.into(), amount.into()])?;

        let (batch, supply) = self.plan_burn(from, amount)?;
        self.finish_burn(&config, from, amount, batch, supply)
    }

    /// Destroy `amount` of `from`'s tokens on `spender`'s allowance
    pub fn burn_from(
        &mut self,
        spender: Address,
        from: Address,
        amount: Amount,
    ) -> ContractResult<()> {
        let config = self.ensure_active()?;
        require_non_negative(amount)?;
        self.env.require_auth(
            &spender,
            "burn_from",
            vec![spender.into(), from.into(), amount.into()],
        )?;

        let remaining = self.require_allowance(from, spender, amount)?;
        let (batch, supply) = self.plan_burn(from, amount)?;

        self.store_spent_allowance(from, spender, amount, remaining)?;
        self.finish_burn(&config, from, amount, batch, supply)
    }

    fn plan_burn(&self, from: Address, amount: Amount) -> ContractResult<(BalanceBatch, Amount)> {
        let mut batch = BalanceBatch::default();
        batch.debit(self, from, amount)?;
        let supply = checked_sub(self.total_supply()?, amount)?;
        Ok((batch, supply))
    }

    fn finish_burn(
        &mut self,
        config: &TokenConfig,
        from: Address,
        amount: Amount,
        batch: BalanceBatch,
        supply: Amount,
    ) -> ContractResult<()> {
        self.commit_balances(batch, config)?;
        self.write(DataKey::Supply, &supply)?;
        self.bump_instance(config)?;

        self.env.publish("burn", vec![from.into()], vec![amount.into()])?;
        debug!(%from, amount, supply, "burn");
        Ok(())
    }
}
