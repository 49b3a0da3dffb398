//! Contract Execution Layer
//!
//! Authorization-gated contract façade over tiered state.
//!
//! # Key Types
//!
//! - [`Env`]: Explicit per-contract handle (id, clock, storage, auth, events)
//! - [`AuthManager`]: Consent checks bound to contract, function and arguments
//! - [`TokenContract`]: Lifecycle (init/admin/pause/upgrade) and token operations
//! - [`TokenConfig`]: Validated token parameters, TOML-loadable
//!
//! # Execution
//!
//! Each call validates state, amounts and authorization, computes every
//! balance change with checked arithmetic, and only then writes.

pub mod accounting;
pub mod auth;
pub mod config;
pub mod env;
pub mod errors;
pub mod events;
pub mod keys;
pub mod lifecycle;
pub mod token;

pub use accounting::Rounding;
pub use auth::{
    ArgValue, AuthError, AuthManager, AuthResult, AuthorizedInvocation, Consent, InvocationContext,
};
pub use config::{TokenConfig, TtlSettings};
pub use env::{Env, InvocationTrace};
pub use errors::{ContractError, ContractResult};
pub use events::{ContractEvent, EventLog};
pub use keys::DataKey;
pub use lifecycle::{ContractState, PendingUpgrade};
pub use token::{AllowanceValue, TokenContract, TransferReceipt};
