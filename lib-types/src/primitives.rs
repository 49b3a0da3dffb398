//! Canonical Primitive Types for Contract State
//!
//! Rule: No String identifiers in contract state. Ever.
//!
//! These types are the foundational building blocks for all state-critical
//! data structures. They are designed to be:
//! - Fixed-size (no dynamic allocation)
//! - Deterministically serializable
//! - Efficient to copy and compare

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// TYPE ALIASES
// ============================================================================

/// Ledger sequence number. TTL deadlines are expressed in this unit.
pub type Sequence = u64;

/// Ledger close time in seconds since the Unix epoch
pub type Timestamp = u64;

/// Signed token amounts. Negative values are never valid balances; the
/// accounting layer rejects them before any arithmetic.
pub type Amount = i128;

/// Basis points for percentage calculations (10000 = 100%)
pub type Bps = u32;

/// Maximum basis points (100%)
pub const MAX_BPS: Bps = 10_000;

/// Maximum length of a [`Symbol`] in bytes
pub const MAX_SYMBOL_LEN: usize = 32;

// ============================================================================
// FIXED 32-BYTE IDENTIFIERS
// ============================================================================

macro_rules! fixed_bytes_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
        )]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// All-zero value, never a valid live identity
            pub const ZERO: Self = Self([0u8; 32]);

            /// Create from raw bytes
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Get the underlying bytes
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Check if this is the zero value
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[..8]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

fixed_bytes_id!(
    /// 32-byte principal address (derived from a public key by the host)
    Address
);

fixed_bytes_id!(
    /// 32-byte identifier of a deployed contract instance
    ContractId
);

fixed_bytes_id!(
    /// 32-byte hash of installed contract code
    WasmHash
);

// ============================================================================
// SYMBOL
// ============================================================================

/// Errors constructing a [`Symbol`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("Symbol is empty")]
    Empty,

    #[error("Symbol too long: {0} bytes (max 32)")]
    TooLong(usize),

    #[error("Invalid symbol character: {0:?}")]
    InvalidChar(char),
}

/// Short identifier for function names and key discriminators.
///
/// Stored inline (no heap) so it can live in fixed-size state records.
/// Allowed characters: `[A-Za-z0-9_]`, 1 to 32 bytes. Serialized as its
/// text and re-validated on the way in.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    len: u8,
    bytes: [u8; MAX_SYMBOL_LEN],
}

impl Symbol {
    /// Validate and build a symbol
    pub fn new(s: &str) -> Result<Self, SymbolError> {
        if s.is_empty() {
            return Err(SymbolError::Empty);
        }
        if s.len() > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
            return Err(SymbolError::InvalidChar(c));
        }

        let mut bytes = [0u8; MAX_SYMBOL_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self {
            len: s.len() as u8,
            bytes,
        })
    }

    /// The symbol text
    pub fn as_str(&self) -> &str {
        // Only ASCII is ever admitted by `new`
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// The symbol bytes (without padding)
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.get(..self.len as usize).unwrap_or_default()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false for a constructed symbol
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Symbol {
    type Error = SymbolError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Symbol::new(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Symbol::new(&s)
    }
}

impl From<Symbol> for String {
    fn from(sym: Symbol) -> Self {
        sym.as_str().to_owned()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_basics() {
        let addr = Address::new([3u8; 32]);
        assert!(!addr.is_zero());
        assert_eq!(addr.as_bytes(), &[3u8; 32]);
        assert!(Address::ZERO.is_zero());
    }

    #[test]
    fn test_address_debug_is_truncated() {
        let addr = Address::new([0xab; 32]);
        assert_eq!(format!("{:?}", addr), "Address(abababababababab)");
        assert_eq!(format!("{}", addr).len(), 64);
    }

    #[test]
    fn test_identifier_ordering_follows_bytes() {
        let low = ContractId::new([1u8; 32]);
        let high = ContractId::new([2u8; 32]);
        assert!(low < high);
    }

    #[test]
    fn test_symbol_valid() {
        let sym = Symbol::new("BALANCE").unwrap();
        assert_eq!(sym.as_str(), "BALANCE");
        assert_eq!(sym.len(), 7);
        assert_eq!(format!("{}", sym), "BALANCE");

        let max = "a".repeat(32);
        assert_eq!(Symbol::new(&max).unwrap().len(), 32);
    }

    #[test]
    fn test_symbol_rejects_bad_input() {
        assert_eq!(Symbol::new(""), Err(SymbolError::Empty));
        assert_eq!(Symbol::new(&"x".repeat(33)), Err(SymbolError::TooLong(33)));
        assert_eq!(Symbol::new("set admin"), Err(SymbolError::InvalidChar(' ')));
        assert_eq!(Symbol::new("déjà"), Err(SymbolError::InvalidChar('é')));
    }

    #[test]
    fn test_symbol_padding_does_not_affect_equality() {
        let a = Symbol::new("transfer").unwrap();
        let b = Symbol::try_from("transfer").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Symbol::new("transfer_from").unwrap());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let addr = Address::new([42u8; 32]);
        let serialized = bincode::serialize(&addr).unwrap();
        let deserialized: Address = bincode::deserialize(&serialized).unwrap();
        assert_eq!(addr, deserialized);

        let sym = Symbol::new("ADMIN").unwrap();
        let serialized = bincode::serialize(&sym).unwrap();
        let deserialized: Symbol = bincode::deserialize(&serialized).unwrap();
        assert_eq!(sym, deserialized);
    }

    #[test]
    fn test_symbol_deserialize_validates() {
        let too_long = bincode::serialize(&"a".repeat(200)).unwrap();
        assert!(bincode::deserialize::<Symbol>(&too_long).is_err());

        let bad_char = bincode::serialize("set admin").unwrap();
        assert!(bincode::deserialize::<Symbol>(&bad_char).is_err());

        let empty = bincode::serialize("").unwrap();
        assert!(bincode::deserialize::<Symbol>(&empty).is_err());

        let ok = bincode::serialize("transfer").unwrap();
        assert_eq!(bincode::deserialize::<Symbol>(&ok).unwrap(), Symbol::new("transfer").unwrap());
    }

    #[test]
    fn test_from_array() {
        let bytes = [5u8; 32];
        let addr: Address = bytes.into();
        assert_eq!(addr.0, bytes);

        let hash: WasmHash = bytes.into();
        assert_eq!(hash.as_bytes(), &bytes);
    }
}
