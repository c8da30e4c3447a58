//! Hashing helpers shared by the CAS, chunk codec, and workspace scanner.
//!

use sha2::{Digest, Sha256};

use crate::model::hash::Hash;

/// Canonical object identity: BLAKE3 of the exact bytes given.
pub fn hash_buffer(buffer: &[u8]) -> Hash {
    Hash::of(buffer)
}

/// Whole-file SHA-256, used by the workspace scanner as a cheap
/// stat-independent equality check, distinct from the chunk-tree hash.
pub fn sha256_buffer(buffer: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    hasher.finalize().into()
}

/// SHA-256 of a BLAKE3 object identity's bytes, for the optional
/// cross-hash projection a `Timeline` may carry.
pub fn sha256_of_hash(hash: &Hash) -> [u8; 32] {
    sha256_buffer(hash.as_bytes())
}
