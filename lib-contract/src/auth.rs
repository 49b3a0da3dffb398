//! Authorization Gate
//!
//! A principal authorizes one exact invocation: the acting contract, the
//! function name and the ordered argument tuple. Proofs are verified by the
//! host's crypto layer before they reach this module; what arrives here is a
//! [`Consent`] that is already known to be genuine.
//!
//! # Rules
//!
//! 1. `require_auth` runs before the first tier write of an operation.
//! 2. Authorize the principal giving something up, never the recipient.
//! 3. A consent is consumed on use and cannot be replayed.
//! 4. A consent past its `valid_until` sequence is rejected.

use std::collections::BTreeMap;

use lib_types::{Address, Amount, ContractId, Sequence, Symbol, WasmHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Domain separator for invocation digests
const INVOCATION_DOMAIN: &[u8] = b"INVOCATION_CONTEXT_V1";

// =============================================================================
// ERRORS
// =============================================================================

/// Why an authorization check failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no consent from {principal} for {function}")]
    MissingConsent { principal: Address, function: Symbol },

    #[error("consent from {principal} for {function} expired at {valid_until}")]
    ConsentExpired {
        principal: Address,
        function: Symbol,
        valid_until: Sequence,
    },

    #[error("caller {caller} is not the admin")]
    NotAdmin { caller: Address },
}

pub type AuthResult<T> = Result<T, AuthError>;

// =============================================================================
// INVOCATION CONTEXT
// =============================================================================

/// One argument of an authorized call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgValue {
    Address(Address),
    Amount(Amount),
    U64(u64),
    Symbol(Symbol),
    Hash([u8; 32]),
    Bool(bool),
}

impl ArgValue {
    fn tag(&self) -> u8 {
        match self {
            ArgValue::Address(_) => 0x01,
            ArgValue::Amount(_) => 0x02,
            ArgValue::U64(_) => 0x03,
            ArgValue::Symbol(_) => 0x04,
            ArgValue::Hash(_) => 0x05,
            ArgValue::Bool(_) => 0x06,
        }
    }

    fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&[self.tag()]);
        match self {
            ArgValue::Address(addr) => hasher.update(addr.as_bytes()),
            ArgValue::Amount(amount) => hasher.update(&amount.to_le_bytes()),
            ArgValue::U64(n) => hasher.update(&n.to_le_bytes()),
            ArgValue::Symbol(sym) => {
                hasher.update(&[sym.len() as u8]);
                hasher.update(sym.as_bytes())
            }
            ArgValue::Hash(bytes) => hasher.update(bytes),
            ArgValue::Bool(b) => hasher.update(&[*b as u8]),
        };
    }
}

impl From<Address> for ArgValue {
    fn from(addr: Address) -> Self {
        ArgValue::Address(addr)
    }
}

impl From<Amount> for ArgValue {
    fn from(amount: Amount) -> Self {
        ArgValue::Amount(amount)
    }
}

impl From<u64> for ArgValue {
    fn from(n: u64) -> Self {
        ArgValue::U64(n)
    }
}

impl From<Symbol> for ArgValue {
    fn from(sym: Symbol) -> Self {
        ArgValue::Symbol(sym)
    }
}

impl From<WasmHash> for ArgValue {
    fn from(hash: WasmHash) -> Self {
        ArgValue::Hash(hash.0)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

/// The exact call a principal consents to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    pub contract: ContractId,
    pub function: Symbol,
    pub args: Vec<ArgValue>,
}

impl InvocationContext {
    pub fn new(contract: ContractId, function: Symbol, args: Vec<ArgValue>) -> Self {
        Self {
            contract,
            function,
            args,
        }
    }

    /// Canonical digest; two contexts match iff their digests match
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(INVOCATION_DOMAIN);
        hasher.update(self.contract.as_bytes());
        hasher.update(&[self.function.len() as u8]);
        hasher.update(self.function.as_bytes());
        hasher.update(&(self.args.len() as u32).to_le_bytes());
        for arg in &self.args {
            arg.hash_into(&mut hasher);
        }
        let hash = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(hash.as_bytes());
        out
    }
}

/// Verified proof that `principal` approved `invocation`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    pub principal: Address,
    pub invocation: InvocationContext,
    /// Last sequence at which the consent may be used; `None` never expires
    pub valid_until: Option<Sequence>,
}

impl Consent {
    pub fn new(principal: Address, invocation: InvocationContext) -> Self {
        Self {
            principal,
            invocation,
            valid_until: None,
        }
    }

    pub fn valid_until(mut self, sequence: Sequence) -> Self {
        self.valid_until = Some(sequence);
        self
    }
}

/// Record of a successful authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedInvocation {
    pub principal: Address,
    pub invocation: InvocationContext,
    pub sequence: Sequence,
}

// =============================================================================
// AUTH MANAGER
// =============================================================================

/// Holds granted consents until they are consumed
#[derive(Debug, Default, Clone)]
pub struct AuthManager {
    consents: BTreeMap<(Address, [u8; 32]), Vec<Option<Sequence>>>,
    authorized: Vec<AuthorizedInvocation>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a verified consent
    pub fn grant(&mut self, consent: Consent) {
        let digest = consent.invocation.digest();
        self.consents
            .entry((consent.principal, digest))
            .or_default()
            .push(consent.valid_until);
    }

    /// Unconsumed consents
    pub fn pending(&self) -> usize {
        self.consents.values().map(Vec::len).sum()
    }

    /// Every invocation authorized so far, in order
    pub fn authorized(&self) -> &[AuthorizedInvocation] {
        &self.authorized
    }

    /// Drop unconsumed consents and the authorization record
    pub fn clear(&mut self) {
        self.consents.clear();
        self.authorized.clear();
    }

    /// Close out one invocation: unconsumed consents are discarded and the
    /// authorization record is handed back
    pub fn finish(&mut self) -> Vec<AuthorizedInvocation> {
        self.consents.clear();
        std::mem::take(&mut self.authorized)
    }

    /// Succeed only if `principal` consented to exactly `invocation`
    pub fn require_auth(
        &mut self,
        principal: &Address,
        invocation: &InvocationContext,
        now: Sequence,
    ) -> AuthResult<()> {
        let slot = (*principal, invocation.digest());

        let result = match self.consents.get_mut(&slot) {
            None => Err(AuthError::MissingConsent {
                principal: *principal,
                function: invocation.function,
            }),
            Some(grants) => {
                let usable = grants
                    .iter()
                    .position(|valid_until| valid_until.map_or(true, |until| now <= until));
                match usable {
                    Some(index) => {
                        grants.remove(index);
                        Ok(())
                    }
                    None => Err(AuthError::ConsentExpired {
                        principal: *principal,
                        function: invocation.function,
                        valid_until: grants.iter().flatten().copied().max().unwrap_or(0),
                    }),
                }
            }
        };

        if self.consents.get(&slot).map_or(false, Vec::is_empty) {
            self.consents.remove(&slot);
        }

        match &result {
            Ok(()) => {
                debug!(%principal, function = %invocation.function, "authorized");
                self.authorized.push(AuthorizedInvocation {
                    principal: *principal,
                    invocation: invocation.clone(),
                    sequence: now,
                });
            }
            Err(err) => warn!(
                %principal,
                function = %invocation.function,
                "authorization rejected: {}",
                err
            ),
        }
        result
    }
}
