//! Contract state primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: No String identifiers in contract state. Ever.

pub mod primitives;

pub use primitives::{
    Address, Amount, Bps, ContractId, Sequence, Symbol, SymbolError, Timestamp, WasmHash,
    MAX_BPS, MAX_SYMBOL_LEN,
};
