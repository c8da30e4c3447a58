//! Bidirectional mapping between this core's BLAKE3 object identity and
//! the Git SHA-1 of the equivalent object, for callers that bridge to a
//! Git remote. Population is the boundary layer's responsibility; this
//! module only stores and looks up the correspondence.
//!

use std::sync::Arc;

use crate::db::KvDb;
use crate::error::StrataError;
use crate::model::hash::Hash;

const FORWARD_PREFIX: &str = "b3/";
const REVERSE_PREFIX: &str = "git/";

pub struct GitMap {
    db: Arc<KvDb>,
}

impl GitMap {
    pub fn new(db: Arc<KvDb>) -> Self {
        Self { db }
    }

    pub fn record(&self, blake3: &Hash, git_sha1: &[u8; 20]) -> Result<(), StrataError> {
        let git_hex = hex::encode(git_sha1);
        self.db
            .put(format!("{FORWARD_PREFIX}{}", blake3.to_hex()), &git_hex)?;
        self.db
            .put(format!("{REVERSE_PREFIX}{git_hex}"), blake3.to_hex())?;
        Ok(())
    }

    pub fn lookup_git_sha1(&self, blake3: &Hash) -> Result<Option<[u8; 20]>, StrataError> {
        match self.db.get(format!("{FORWARD_PREFIX}{}", blake3.to_hex()))? {
            Some(bytes) => {
                let hex_str = std::str::from_utf8(&bytes)?;
                let decoded = hex::decode(hex_str)?;
                let mut out = [0u8; 20];
                if decoded.len() != 20 {
                    return Err(StrataError::invalid_encoding("git sha1 not 20 bytes"));
                }
                out.copy_from_slice(&decoded);
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    pub fn lookup_blake3(&self, git_sha1: &[u8; 20]) -> Result<Option<Hash>, StrataError> {
        let key = format!("{REVERSE_PREFIX}{}", hex::encode(git_sha1));
        match self.db.get(key)? {
            Some(bytes) => {
                let hex_str = std::str::from_utf8(&bytes)?;
                Ok(Some(hex_str.parse()?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::open(dir.path().join("git_map.db")).unwrap();
        let map = GitMap::new(db);

        let blake3 = Hash::of(b"content");
        let git_sha1 = [7u8; 20];
        map.record(&blake3, &git_sha1).unwrap();

        assert_eq!(map.lookup_git_sha1(&blake3).unwrap(), Some(git_sha1));
        assert_eq!(map.lookup_blake3(&git_sha1).unwrap(), Some(blake3));
    }

    #[test]
    fn test_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::open(dir.path().join("git_map.db")).unwrap();
        let map = GitMap::new(db);
        assert!(map.lookup_git_sha1(&Hash::of(b"nope")).unwrap().is_none());
    }
}
