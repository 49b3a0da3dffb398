//! Token operation tests
//!
//! Authorization binding, fee accounting, allowances, and the guarantee that
//! a rejected call writes nothing.

mod common;

use common::*;
use lib_contract::{AuthError, ContractError, TtlSettings};
use lib_state::Tier;

// =============================================================================
// Authorization
// =============================================================================

#[test]
fn test_transfer_without_matching_consent_changes_nothing() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);

    // Consent for a different amount
    h.consent_transfer(ALICE, BOB, 31);
    let result = h.token.transfer(ALICE, BOB, 30);
    assert!(matches!(
        result,
        Err(ContractError::Unauthorized(AuthError::MissingConsent { .. }))
    ));
    assert_eq!(h.token.balance(ALICE).unwrap(), 100);
    assert_eq!(h.token.balance(BOB).unwrap(), 0);

    // Consent from the recipient does not count
    h.consent(BOB, "transfer", vec![ALICE.into(), BOB.into(), 30i128.into()]);
    assert!(matches!(
        h.token.transfer(ALICE, BOB, 30),
        Err(ContractError::Unauthorized(_))
    ));
    assert_eq!(h.token.balance(ALICE).unwrap(), 100);
    assert_eq!(h.token.balance(BOB).unwrap(), 0);

    h.consent_transfer(ALICE, BOB, 30);
    h.token.transfer(ALICE, BOB, 30).unwrap();
    assert_eq!(h.token.balance(ALICE).unwrap(), 70);
    assert_eq!(h.token.balance(BOB).unwrap(), 30);
}

#[test]
fn test_rejected_auth_writes_nothing() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);
    let before = h.token.env().storage().stats();

    assert!(h.token.transfer(ALICE, BOB, 30).is_err());

    let after = h.token.env().storage().stats();
    assert_eq!(after.mutations(), before.mutations());
    assert_eq!(h.token.env().events().named("transfer").count(), 0);
}

#[test]
fn test_consent_cannot_be_replayed() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);
    h.consent_transfer(ALICE, BOB, 10);
    h.token.transfer(ALICE, BOB, 10).unwrap();
    assert!(matches!(
        h.token.transfer(ALICE, BOB, 10),
        Err(ContractError::Unauthorized(_))
    ));
    assert_eq!(h.token.balance(BOB).unwrap(), 10);
}

#[test]
fn test_mint_by_non_admin() {
    let mut h = Harness::initialized(config());
    h.consent(ALICE, "mint", vec![ALICE.into(), ALICE.into(), 50i128.into()]);
    let result = h.token.mint(ALICE, ALICE, 50);
    assert_eq!(
        result,
        Err(ContractError::Unauthorized(AuthError::NotAdmin { caller: ALICE }))
    );
    assert_eq!(h.token.total_supply().unwrap(), 0);
}

// =============================================================================
// Validation order
// =============================================================================

#[test]
fn test_paused_transfer_touches_no_tier() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);
    h.pause();
    h.consent_transfer(ALICE, BOB, 30);
    let before = h.token.env().storage().stats();

    assert_eq!(h.token.transfer(ALICE, BOB, 30), Err(ContractError::ContractPaused));

    let after = h.token.env().storage().stats();
    assert_eq!(after.writes, before.writes);
    assert_eq!(after.ttl_extensions, before.ttl_extensions);
    assert_eq!(after.mutations(), before.mutations());
    // Pause is checked before authorization, so the consent is still unused
    assert_eq!(h.token.env().auth().pending(), 1);
    assert_eq!(h.token.balance(ALICE).unwrap(), 100);
}

#[test]
fn test_operations_before_initialize() {
    let mut h = Harness::new();
    h.consent_transfer(ALICE, BOB, 1);
    assert_eq!(h.token.transfer(ALICE, BOB, 1), Err(ContractError::NotInitialized));
    assert_eq!(h.token.env().storage().stats().mutations(), 0);
}

#[test]
fn test_negative_amount_rejected_before_auth() {
    let mut h = Harness::initialized(config());
    h.consent_transfer(ALICE, BOB, -5);
    assert!(matches!(
        h.token.transfer(ALICE, BOB, -5),
        Err(ContractError::InvalidAmount(_))
    ));
    assert_eq!(h.token.env().auth().pending(), 1);
}

#[test]
fn test_zero_transfer_allowed() {
    let mut h = Harness::initialized(config());
    h.consent_transfer(ALICE, BOB, 0);
    let receipt = h.token.transfer(ALICE, BOB, 0).unwrap();
    assert_eq!(receipt.debited, 0);
    assert_eq!(h.token.balance(ALICE).unwrap(), 0);
}

#[test]
fn test_insufficient_balance() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 10);
    h.consent_transfer(ALICE, BOB, 11);
    assert_eq!(
        h.token.transfer(ALICE, BOB, 11),
        Err(ContractError::InsufficientBalance { have: 10, need: 11 })
    );
}

#[test]
fn test_self_transfer_keeps_balance() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 40);
    h.consent_transfer(ALICE, ALICE, 40);
    h.token.transfer(ALICE, ALICE, 40).unwrap();
    assert_eq!(h.token.balance(ALICE).unwrap(), 40);
}

// =============================================================================
// Arithmetic
// =============================================================================

#[test]
fn test_mint_overflow_leaves_state() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, i128::MAX);

    h.consent(ADMIN, "mint", vec![ADMIN.into(), BOB.into(), 1i128.into()]);
    assert_eq!(h.token.mint(ADMIN, BOB, 1), Err(ContractError::Overflow));
    assert_eq!(h.token.balance(BOB).unwrap(), 0);
    assert_eq!(h.token.total_supply().unwrap(), i128::MAX);
}

#[test]
fn test_transfer_fee() {
    let mut h = Harness::initialized(config().with_transfer_fee(25));
    h.mint(ALICE, 10_000);

    h.consent_transfer(ALICE, BOB, 1_000);
    let receipt = h.token.transfer(ALICE, BOB, 1_000).unwrap();
    assert_eq!(receipt.fee, 2);
    assert_eq!(receipt.debited, 1_002);

    assert_eq!(h.token.balance(ALICE).unwrap(), 8_998);
    assert_eq!(h.token.balance(BOB).unwrap(), 1_000);
    assert_eq!(h.token.balance(FEES).unwrap(), 2);
    assert_eq!(h.token.total_supply().unwrap(), 10_000);
}

#[test]
fn test_fee_counts_against_balance() {
    let mut h = Harness::initialized(config().with_transfer_fee(100));
    h.mint(ALICE, 1_000);
    h.consent_transfer(ALICE, BOB, 1_000);
    assert_eq!(
        h.token.transfer(ALICE, BOB, 1_000),
        Err(ContractError::InsufficientBalance { have: 1_000, need: 1_010 })
    );
    assert_eq!(h.token.balance(FEES).unwrap(), 0);
}

#[test]
fn test_burn_reduces_supply() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);
    h.consent(ALICE, "burn", vec![ALICE.into(), 40i128.into()]);
    h.token.burn(ALICE, 40).unwrap();
    assert_eq!(h.token.balance(ALICE).unwrap(), 60);
    assert_eq!(h.token.total_supply().unwrap(), 60);
    assert_eq!(h.token.env().events().named("burn").count(), 1);
}

// =============================================================================
// Allowances
// =============================================================================

#[test]
fn test_allowance_spend_and_expiry() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);
    let expiration = h.sequence() + 20;

    h.consent(
        ALICE,
        "approve",
        vec![ALICE.into(), SPENDER.into(), 50i128.into(), expiration.into()],
    );
    h.token.approve(ALICE, SPENDER, 50, expiration).unwrap();
    assert_eq!(h.token.allowance(ALICE, SPENDER).unwrap(), 50);

    h.consent(
        SPENDER,
        "transfer_from",
        vec![SPENDER.into(), ALICE.into(), BOB.into(), 30i128.into()],
    );
    h.token.transfer_from(SPENDER, ALICE, BOB, 30).unwrap();
    assert_eq!(h.token.allowance(ALICE, SPENDER).unwrap(), 20);
    assert_eq!(h.token.balance(BOB).unwrap(), 30);

    // Usable through the expiration sequence, gone after it
    h.clock.advance_to(expiration).unwrap();
    assert_eq!(h.token.allowance(ALICE, SPENDER).unwrap(), 20);
    h.clock.advance(1).unwrap();
    assert_eq!(h.token.allowance(ALICE, SPENDER).unwrap(), 0);

    h.consent(
        SPENDER,
        "transfer_from",
        vec![SPENDER.into(), ALICE.into(), BOB.into(), 10i128.into()],
    );
    assert_eq!(
        h.token.transfer_from(SPENDER, ALICE, BOB, 10),
        Err(ContractError::InsufficientAllowance { have: 0, need: 10 })
    );
}

#[test]
fn test_allowance_lives_in_temporary_tier() {
    let mut h = Harness::initialized(config());
    let expiration = h.sequence() + 500;
    h.consent(
        ALICE,
        "approve",
        vec![ALICE.into(), SPENDER.into(), 5i128.into(), expiration.into()],
    );
    h.token.approve(ALICE, SPENDER, 5, expiration).unwrap();

    let key = lib_contract::DataKey::Allowance { owner: ALICE, spender: SPENDER }
        .storage_key()
        .unwrap();
    assert_eq!(
        h.token.env().live_until(Tier::Temporary, &key).unwrap(),
        Some(expiration)
    );
}

#[test]
fn test_approve_zero_revokes() {
    let mut h = Harness::initialized(config());
    let expiration = h.sequence() + 100;
    h.consent(
        ALICE,
        "approve",
        vec![ALICE.into(), SPENDER.into(), 5i128.into(), expiration.into()],
    );
    h.token.approve(ALICE, SPENDER, 5, expiration).unwrap();

    h.consent(
        ALICE,
        "approve",
        vec![ALICE.into(), SPENDER.into(), 0i128.into(), 0u64.into()],
    );
    h.token.approve(ALICE, SPENDER, 0, 0).unwrap();
    assert_eq!(h.token.allowance(ALICE, SPENDER).unwrap(), 0);
}

#[test]
fn test_approve_with_past_expiration() {
    let mut h = Harness::initialized(config());
    let past = h.sequence() - 1;
    h.consent(
        ALICE,
        "approve",
        vec![ALICE.into(), SPENDER.into(), 5i128.into(), past.into()],
    );
    assert!(matches!(
        h.token.approve(ALICE, SPENDER, 5, past),
        Err(ContractError::InvalidAmount(_))
    ));
}

#[test]
fn test_burn_from_uses_allowance() {
    let mut h = Harness::initialized(config());
    h.mint(ALICE, 100);
    let expiration = h.sequence() + 100;
    h.consent(
        ALICE,
        "approve",
        vec![ALICE.into(), SPENDER.into(), 25i128.into(), expiration.into()],
    );
    h.token.approve(ALICE, SPENDER, 25, expiration).unwrap();

    h.consent(SPENDER, "burn_from", vec![SPENDER.into(), ALICE.into(), 30i128.into()]);
    assert_eq!(
        h.token.burn_from(SPENDER, ALICE, 30),
        Err(ContractError::InsufficientAllowance { have: 25, need: 30 })
    );

    h.consent(SPENDER, "burn_from", vec![SPENDER.into(), ALICE.into(), 25i128.into()]);
    h.token.burn_from(SPENDER, ALICE, 25).unwrap();
    assert_eq!(h.token.balance(ALICE).unwrap(), 75);
    assert_eq!(h.token.total_supply().unwrap(), 75);
    assert_eq!(h.token.allowance(ALICE, SPENDER).unwrap(), 0);
}

// =============================================================================
// Lifetimes
// =============================================================================

/// Instance outlives balances so only the balance TTL is under test
fn long_instance_config() -> lib_contract::TokenConfig {
    config().with_ttl(TtlSettings {
        instance_threshold: 1_000_000,
        instance_extend_to: 2_000_000,
        balance_threshold: 4_500,
        balance_extend_to: 5_000,
    })
}

#[test]
fn test_balance_lost_without_extension() {
    let mut h = Harness::initialized(long_instance_config());
    h.mint(ALICE, 100);

    let key = lib_contract::DataKey::Balance(ALICE).storage_key().unwrap();
    let deadline = h.token.env().live_until(Tier::Persistent, &key).unwrap().unwrap();
    assert_eq!(deadline, h.sequence() + 5_000);

    h.clock.advance_to(deadline + 1).unwrap();
    assert_eq!(h.token.balance(ALICE).unwrap(), 0);
}

#[test]
fn test_balance_kept_alive_by_activity() {
    let mut h = Harness::initialized(long_instance_config());
    h.mint(ALICE, 100);
    h.mint(BOB, 1);

    // Every touch below the threshold pushes the deadline out again
    for _ in 0..4 {
        h.clock.advance(4_800).unwrap();
        h.consent_transfer(ALICE, BOB, 1);
        h.token.transfer(ALICE, BOB, 1).unwrap();
    }
    assert_eq!(h.token.balance(ALICE).unwrap(), 96);
    assert_eq!(h.token.balance(BOB).unwrap(), 5);
}
