//! 32-byte BLAKE3 object identity, used as both the canonical hash of a
//! hashable object and its key in the content-addressed store.
//!

use crate::error::StrataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash as StdHash, Hasher};

pub const HASH_LEN: usize = 32;

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    pub fn new(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn zero() -> Self {
        Self([0u8; HASH_LEN])
    }

    /// Hash of `bytes` using the canonical BLAKE3 algorithm.
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First two hex characters, used as the CAS shard directory name.
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0[0..1])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }
}

impl std::str::FromStr for Hash {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != HASH_LEN {
            return Err(StrataError::invalid_encoding(format!(
                "hash must be {HASH_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; HASH_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl StdHash for Hash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip_hex() {
        let h = Hash::of(b"hello world");
        let hex = h.to_hex();
        let parsed: Hash = hex.parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn test_same_bytes_same_hash() {
        assert_eq!(Hash::of(b"abc"), Hash::of(b"abc"));
        assert_ne!(Hash::of(b"abc"), Hash::of(b"abd"));
    }
}
