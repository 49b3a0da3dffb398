//! Key Encoding
//!
//! Key encoding is PROTOCOL. Every storage key is built here from a list of
//! tagged parts; never concatenate key bytes in business logic.
//!
//! # Key Design Principles
//!
//! 1. **Deterministic** - Same parts always produce the same bytes
//! 2. **Sortable** - Integers are big-endian so keys sort numerically
//! 3. **Unambiguous** - Every part carries a tag and a known width, so the
//!    byte string decodes back to exactly one list of parts
//!
//! # Format
//!
//! ```text
//! Symbol  : 0x01 | len: u8 | bytes[len]
//! Address : 0x02 | bytes[32]
//! U64     : 0x03 | u64 big-endian
//! I128    : 0x04 | i128 big-endian with sign bit flipped
//! ```

use std::fmt;

use lib_types::{Address, Symbol};
use serde::{Deserialize, Serialize};

use crate::errors::{StateError, StateResult};

const TAG_SYMBOL: u8 = 0x01;
const TAG_ADDRESS: u8 = 0x02;
const TAG_U64: u8 = 0x03;
const TAG_I128: u8 = 0x04;

const I128_SIGN_BIT: u128 = 1 << 127;

/// One component of a composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Symbol(Symbol),
    Address(Address),
    U64(u64),
    I128(i128),
}

impl From<Symbol> for KeyPart {
    fn from(s: Symbol) -> Self {
        KeyPart::Symbol(s)
    }
}

impl From<Address> for KeyPart {
    fn from(a: Address) -> Self {
        KeyPart::Address(a)
    }
}

impl From<u64> for KeyPart {
    fn from(v: u64) -> Self {
        KeyPart::U64(v)
    }
}

impl From<i128> for KeyPart {
    fn from(v: i128) -> Self {
        KeyPart::I128(v)
    }
}

/// Encoded, totally ordered storage key
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorageKey(Vec<u8>);

impl StorageKey {
    /// Encode a composite key. At least one part is required.
    pub fn encode(parts: &[KeyPart]) -> StateResult<Self> {
        if parts.is_empty() {
            return Err(StateError::InvalidKey("key has no parts".to_string()));
        }

        let mut out = Vec::with_capacity(parts.len() * 33);
        for part in parts {
            match part {
                KeyPart::Symbol(sym) => {
                    out.push(TAG_SYMBOL);
                    out.push(sym.len() as u8);
                    out.extend_from_slice(sym.as_bytes());
                }
                KeyPart::Address(addr) => {
                    out.push(TAG_ADDRESS);
                    out.extend_from_slice(addr.as_bytes());
                }
                KeyPart::U64(v) => {
                    out.push(TAG_U64);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                KeyPart::I128(v) => {
                    out.push(TAG_I128);
                    out.extend_from_slice(&((*v as u128) ^ I128_SIGN_BIT).to_be_bytes());
                }
            }
        }
        Ok(Self(out))
    }

    /// Key consisting of a single discriminator symbol, e.g. `"ADMIN"`
    pub fn symbol(name: &str) -> StateResult<Self> {
        Self::encode(&[KeyPart::Symbol(Symbol::new(name)?)])
    }

    /// Discriminator plus one address, e.g. `("BALANCE", addr)`
    pub fn with_address(name: &str, addr: &Address) -> StateResult<Self> {
        Self::encode(&[KeyPart::Symbol(Symbol::new(name)?), KeyPart::Address(*addr)])
    }

    /// Discriminator plus two addresses, e.g. `("ALLOWANCE", owner, spender)`
    pub fn with_address_pair(name: &str, first: &Address, second: &Address) -> StateResult<Self> {
        Self::encode(&[
            KeyPart::Symbol(Symbol::new(name)?),
            KeyPart::Address(*first),
            KeyPart::Address(*second),
        ])
    }

    /// Rebuild a key from bytes previously produced by [`encode`](Self::encode)
    pub fn from_bytes(bytes: Vec<u8>) -> StateResult<Self> {
        let key = Self(bytes);
        key.parts()?;
        Ok(key)
    }

    /// Decode back into parts
    pub fn parts(&self) -> StateResult<Vec<KeyPart>> {
        let bytes = &self.0;
        if bytes.is_empty() {
            return Err(StateError::InvalidKey("empty key".to_string()));
        }

        let mut parts = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let tag = bytes[pos];
            pos += 1;
            match tag {
                TAG_SYMBOL => {
                    let len = *bytes
                        .get(pos)
                        .ok_or_else(|| truncated("symbol length"))? as usize;
                    pos += 1;
                    let raw = take(bytes, pos, len, "symbol")?;
                    let text = std::str::from_utf8(raw)
                        .map_err(|e| StateError::InvalidKey(e.to_string()))?;
                    parts.push(KeyPart::Symbol(Symbol::new(text)?));
                    pos += len;
                }
                TAG_ADDRESS => {
                    let raw = take(bytes, pos, 32, "address")?;
                    let mut addr = [0u8; 32];
                    addr.copy_from_slice(raw);
                    parts.push(KeyPart::Address(Address(addr)));
                    pos += 32;
                }
                TAG_U64 => {
                    let raw = take(bytes, pos, 8, "u64")?;
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(raw);
                    parts.push(KeyPart::U64(u64::from_be_bytes(buf)));
                    pos += 8;
                }
                TAG_I128 => {
                    let raw = take(bytes, pos, 16, "i128")?;
                    let mut buf = [0u8; 16];
                    buf.copy_from_slice(raw);
                    let v = (u128::from_be_bytes(buf) ^ I128_SIGN_BIT) as i128;
                    parts.push(KeyPart::I128(v));
                    pos += 16;
                }
                other => {
                    return Err(StateError::InvalidKey(format!("unknown tag 0x{:02x}", other)));
                }
            }
        }
        Ok(parts)
    }

    /// Check whether this key starts with every byte of `prefix`
    pub fn starts_with(&self, prefix: &StorageKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for StorageKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parts() {
            Ok(parts) => {
                let mut t = f.debug_tuple("StorageKey");
                for part in &parts {
                    match part {
                        KeyPart::Symbol(s) => t.field(&s.as_str()),
                        KeyPart::Address(a) => t.field(a),
                        KeyPart::U64(v) => t.field(v),
                        KeyPart::I128(v) => t.field(v),
                    };
                }
                t.finish()
            }
            Err(_) => write!(f, "StorageKey(<{} raw bytes>)", self.0.len()),
        }
    }
}

fn truncated(what: &str) -> StateError {
    StateError::InvalidKey(format!("truncated {}", what))
}

fn take<'a>(bytes: &'a [u8], pos: usize, len: usize, what: &str) -> StateResult<&'a [u8]> {
    bytes.get(pos..pos + len).ok_or_else(|| truncated(what))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> KeyPart {
        KeyPart::Symbol(Symbol::new(s).unwrap())
    }

    #[test]
    fn test_composite_key_roundtrip() {
        let addr = Address([0xab; 32]);
        let parts = vec![
            sym("BALANCE"),
            KeyPart::Address(addr),
            KeyPart::U64(7),
            KeyPart::I128(-5),
        ];
        let key = StorageKey::encode(&parts).unwrap();
        assert_eq!(key.parts().unwrap(), parts);
        assert_eq!(key.len(), 1 + 1 + 7 + 33 + 9 + 17);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(StorageKey::encode(&[]).is_err());
        assert!(StorageKey::from_bytes(vec![]).is_err());
    }

    #[test]
    fn test_u64_parts_sort_numerically() {
        let k1 = StorageKey::encode(&[sym("NONCE"), KeyPart::U64(1)]).unwrap();
        let k2 = StorageKey::encode(&[sym("NONCE"), KeyPart::U64(256)]).unwrap();
        let kmax = StorageKey::encode(&[sym("NONCE"), KeyPart::U64(u64::MAX)]).unwrap();
        assert!(k1 < k2);
        assert!(k2 < kmax);
    }

    #[test]
    fn test_i128_parts_sort_numerically() {
        let values = [i128::MIN, -1_000, -1, 0, 1, 1_000, i128::MAX];
        let keys: Vec<StorageKey> = values
            .iter()
            .map(|v| StorageKey::encode(&[KeyPart::I128(*v)]).unwrap())
            .collect();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_distinct_shapes_never_collide() {
        let addr = Address([1u8; 32]);
        let a = StorageKey::with_address("BALANCE", &addr).unwrap();
        let b = StorageKey::with_address_pair("BALANCE", &addr, &addr).unwrap();
        let c = StorageKey::symbol("BALANCE").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(&c));
        assert!(b.starts_with(&a));
    }

    #[test]
    fn test_symbol_length_prefix_disambiguates() {
        // "AB" + "C" must differ from "A" + "BC"
        let k1 = StorageKey::encode(&[sym("AB"), sym("C")]).unwrap();
        let k2 = StorageKey::encode(&[sym("A"), sym("BC")]).unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_parse_invalid_keys() {
        assert!(StorageKey::from_bytes(vec![TAG_ADDRESS, 0, 0]).is_err());
        assert!(StorageKey::from_bytes(vec![TAG_SYMBOL, 5, b'A']).is_err());
        assert!(StorageKey::from_bytes(vec![0xff]).is_err());
        assert!(StorageKey::from_bytes(vec![TAG_U64, 0, 0, 0, 0, 0, 0, 0, 9]).is_ok());
    }

    #[test]
    fn test_debug_shows_parts() {
        let key = StorageKey::symbol("ADMIN").unwrap();
        assert_eq!(format!("{:?}", key), "StorageKey(\"ADMIN\")");
    }
}
