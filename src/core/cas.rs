//! The content-addressed object store. `put` validates that BLAKE3 of the
//! bytes equals the claimed hash; `get` fails `NotFound` for unknown keys.
//! Reads are idempotent and writes are idempotent over equal bytes, so
//! concurrent writers racing to store the same object never corrupt it.
//!

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::StrataError;
use crate::model::hash::Hash;
use crate::util;

pub trait ContentStore: Send + Sync {
    fn put(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StrataError>;
    fn get(&self, hash: &Hash) -> Result<Vec<u8>, StrataError>;
    fn has(&self, hash: &Hash) -> bool;

    /// Hashes `bytes` and stores it, returning the computed hash. Most
    /// callers build an object and store it in the same step.
    fn write(&self, bytes: &[u8]) -> Result<Hash, StrataError> {
        let hash = Hash::of(bytes);
        self.put(&hash, bytes)?;
        Ok(hash)
    }
}

/// Disk-backed store sharded by the hash's first byte (256 subdirectories
/// of two hex characters each), mirroring a Git object database's layout.
pub struct DiskCas {
    objects_dir: PathBuf,
}

impl DiskCas {
    pub fn new(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, hash: &Hash) -> PathBuf {
        let hex = hash.to_hex();
        self.objects_dir.join(hash.shard_prefix()).join(&hex[2..])
    }
}

impl ContentStore for DiskCas {
    fn put(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StrataError> {
        if &Hash::of(bytes) != hash {
            return Err(StrataError::invalid_hash(format!(
                "content does not hash to {hash}"
            )));
        }
        let path = self.path_for(hash);
        if path.exists() {
            return Ok(());
        }
        util::fs::write_data(&path, bytes)
    }

    fn get(&self, hash: &Hash) -> Result<Vec<u8>, StrataError> {
        let path = self.path_for(hash);
        if !path.exists() {
            return Err(StrataError::not_found(format!("object {hash}")));
        }
        util::fs::read_bytes_from_path(&path)
    }

    fn has(&self, hash: &Hash) -> bool {
        self.path_for(hash).exists()
    }
}

/// In-memory store with the same contract, used by unit tests that don't
/// need a working directory on disk.
#[derive(Default)]
pub struct MemoryCas {
    objects: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl MemoryCas {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryCas {
    fn put(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StrataError> {
        if &Hash::of(bytes) != hash {
            return Err(StrataError::invalid_hash(format!(
                "content does not hash to {hash}"
            )));
        }
        self.objects.write().entry(*hash).or_insert_with(|| bytes.to_vec());
        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Vec<u8>, StrataError> {
        self.objects
            .read()
            .get(hash)
            .cloned()
            .ok_or_else(|| StrataError::not_found(format!("object {hash}")))
    }

    fn has(&self, hash: &Hash) -> bool {
        self.objects.read().contains_key(hash)
    }
}
