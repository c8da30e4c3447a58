//! Append-only Merkle Mountain Range history log. Every commit appends a
//! leaf; position assignment is monotonic and never reused. Peaks are
//! recomputed incrementally and persisted so the accumulator survives a
//! process restart.
//!

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::KvDb;
use crate::error::StrataError;
use crate::model::hash::Hash;
use crate::model::Identity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MmrLeaf {
    pub tree_root: Hash,
    pub timeline: String,
    pub previous_index: Option<u64>,
    pub author: Identity,
    pub unix_time: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Peak {
    position: u64,
    height: u32,
    hash: Hash,
}

fn leaf_key(position: u64) -> String {
    format!("leaf:{position:020}")
}

fn node_hash_key(position: u64) -> String {
    format!("node:{position:020}")
}

fn parent_node_key(seq: u64) -> String {
    format!("parent:{seq:020}")
}

/// A handle onto one repository's MMR, backed by a rocksdb instance. Peak
/// state and the next position are persisted under fixed keys so the
/// structure resumes correctly across restarts.
pub struct Mmr {
    db: Arc<KvDb>,
}

impl Mmr {
    pub fn new(db: Arc<KvDb>) -> Self {
        Self { db }
    }

    fn size(&self) -> Result<u64, StrataError> {
        match self.db.get(b"size")? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(0),
        }
    }

    fn peaks_state(&self) -> Result<Vec<Peak>, StrataError> {
        match self.db.get(b"peaks")? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn next_parent_seq(&self) -> Result<u64, StrataError> {
        match self.db.get(b"parent_seq")? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(0),
        }
    }

    /// Appends a leaf, assigns it the next position, merges peaks of equal
    /// height, and persists the updated accumulator state.
    pub fn append(&self, leaf: &MmrLeaf) -> Result<u64, StrataError> {
        let position = self.size()?;
        let leaf_bytes = serde_json::to_vec(leaf)?;
        let leaf_hash = Hash::of(&leaf_bytes);

        self.db.put(leaf_key(position), &leaf_bytes)?;
        self.db.put(node_hash_key(position), leaf_hash.as_bytes())?;

        let mut peaks = self.peaks_state()?;
        peaks.push(Peak {
            position,
            height: 0,
            hash: leaf_hash,
        });

        // A single append can cascade through several merges (e.g. the 4th
        // leaf merges [0,1] then merges that result with [2,3]), so each
        // new internal node needs its own key; `parent_seq` is a running
        // counter distinct from both leaf position and any other merge in
        // this same call, persisted so it survives a restart.
        let mut parent_seq = self.next_parent_seq()?;
        while peaks.len() >= 2 && peaks[peaks.len() - 1].height == peaks[peaks.len() - 2].height {
            let right = peaks.pop().unwrap();
            let left = peaks.pop().unwrap();
            let mut combined = Vec::with_capacity(64);
            combined.extend_from_slice(left.hash.as_bytes());
            combined.extend_from_slice(right.hash.as_bytes());
            let parent_hash = Hash::of(&combined);
            self.db
                .put(parent_node_key(parent_seq), parent_hash.as_bytes())?;
            peaks.push(Peak {
                position: parent_seq,
                height: left.height + 1,
                hash: parent_hash,
            });
            parent_seq += 1;
        }

        self.db.put("peaks", serde_json::to_vec(&peaks)?)?;
        self.db.put("size", serde_json::to_vec(&(position + 1))?)?;
        self.db.put("parent_seq", serde_json::to_vec(&parent_seq)?)?;

        Ok(position)
    }

    /// The current peak hashes, lowest height first.
    pub fn peaks(&self) -> Result<Vec<Hash>, StrataError> {
        Ok(self.peaks_state()?.into_iter().map(|p| p.hash).collect())
    }

    /// Bags the current peaks into a single accumulator hash, or `None` if
    /// the log is empty.
    pub fn root_hash(&self) -> Result<Option<Hash>, StrataError> {
        let peaks = self.peaks()?;
        Ok(peaks.into_iter().reduce(|acc, peak| {
            let mut combined = Vec::with_capacity(64);
            combined.extend_from_slice(acc.as_bytes());
            combined.extend_from_slice(peak.as_bytes());
            Hash::of(&combined)
        }))
    }

    pub fn get_leaf(&self, position: u64) -> Result<MmrLeaf, StrataError> {
        let bytes = self
            .db
            .get(leaf_key(position))?
            .ok_or_else(|| StrataError::not_found(format!("mmr leaf {position}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Walks the first-parent chain starting at `position`, following each
    /// leaf's `previous_index` pointer, in O(1) per step.
    pub fn first_parent_chain(&self, position: u64) -> Result<Vec<MmrLeaf>, StrataError> {
        let mut out = Vec::new();
        let mut cursor = Some(position);
        while let Some(pos) = cursor {
            let leaf = self.get_leaf(pos)?;
            cursor = leaf.previous_index;
            out.push(leaf);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mmr() -> (tempfile::TempDir, Mmr) {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::open(dir.path().join("mmr.db")).unwrap();
        (dir, Mmr::new(db))
    }

    fn leaf(message: &str, previous: Option<u64>) -> MmrLeaf {
        MmrLeaf {
            tree_root: Hash::of(message.as_bytes()),
            timeline: "main".to_string(),
            previous_index: previous,
            author: Identity {
                name: "a".to_string(),
                email: "a@x".to_string(),
            },
            unix_time: 0,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_append_assigns_monotonic_positions() {
        let (_dir, mmr) = mmr();
        let p0 = mmr.append(&leaf("first", None)).unwrap();
        let p1 = mmr.append(&leaf("second", Some(p0))).unwrap();
        let p2 = mmr.append(&leaf("third", Some(p1))).unwrap();
        assert_eq!((p0, p1, p2), (0, 1, 2));
    }

    #[test]
    fn test_first_parent_chain_walks_back_to_root() {
        let (_dir, mmr) = mmr();
        let p0 = mmr.append(&leaf("first", None)).unwrap();
        let p1 = mmr.append(&leaf("second", Some(p0))).unwrap();
        let chain = mmr.first_parent_chain(p1).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].message, "second");
        assert_eq!(chain[1].message, "first");
    }

    #[test]
    fn test_root_hash_changes_on_append() {
        let (_dir, mmr) = mmr();
        assert!(mmr.root_hash().unwrap().is_none());
        mmr.append(&leaf("first", None)).unwrap();
        let after_one = mmr.root_hash().unwrap();
        mmr.append(&leaf("second", Some(0))).unwrap();
        let after_two = mmr.root_hash().unwrap();
        assert_ne!(after_one, after_two);
    }
}
