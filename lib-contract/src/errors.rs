//! Contract Errors

use lib_state::StateError;
use lib_types::{Amount, Sequence, SymbolError};
use thiserror::Error;

use crate::auth::AuthError;

/// Error raised by a contract call. Every variant is terminal for the call
/// and is returned before any tier write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Contract already initialized")]
    AlreadyInitialized,

    #[error("Contract not initialized")]
    NotInitialized,

    #[error("Contract instance archived; restore it first")]
    InstanceArchived,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Contract is paused")]
    ContractPaused,

    #[error("Timelock not expired: unlocks at {unlock_sequence}, now {now}")]
    TimelockNotExpired { unlock_sequence: Sequence, now: Sequence },

    #[error("No pending upgrade")]
    NoPendingUpgrade,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl From<SymbolError> for ContractError {
    fn from(err: SymbolError) -> Self {
        ContractError::InvalidConfiguration(err.to_string())
    }
}

/// Result type for contract calls
pub type ContractResult<T> = Result<T, ContractError>;
