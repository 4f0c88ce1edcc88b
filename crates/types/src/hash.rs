//! Blake3 hashes for blocks, state roots and commitments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte Blake3 hash.
///
/// Block hashes, ledger state roots, merkle nodes, request commitments and
/// derived account ids are all of this type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash([u8; 32]);

impl Hash {
    /// All-zero hash; the state root of an empty ledger and the parent of
    /// genesis.
    pub const ZERO: Self = Self([0u8; 32]);

    /// All-ones hash; the upper bound when ranging over hash-keyed entries.
    pub const MAX: Self = Self([0xffu8; 32]);

    /// Hash raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Hash the concatenation of `parts` without allocating it.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Hash `bytes` under a domain tag, so equal inputs in different
    /// domains never collide.
    pub fn tagged(tag: &str, bytes: &[u8]) -> Self {
        Self::from_parts(&[tag.as_bytes(), b":", bytes])
    }

    /// Hash the canonical encoding of a value.
    pub fn of<T: Serialize>(value: &T) -> Self {
        Self::from_bytes(&crate::encode(value))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Hash({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Eight hex digits are plenty to tell blocks and requests apart in logs.
        write!(f, "0x{}", &self.to_hex()[..8])
    }
}
