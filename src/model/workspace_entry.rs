//! Workspace index metadata: what the scanner records for each tracked
//! path, and the diff shape the shelf manager and merge engine consume.
//!

use serde::{Deserialize, Serialize};

use crate::model::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Dir,
    Submodule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    /// Forward-slash separated, relative to the workspace root.
    pub path: String,
    pub kind: EntryKind,
    /// Root hash of the entry's chunk tree (files) or HAMT (dirs).
    pub file_ref: Hash,
    pub mode: u32,
    pub size: u64,
    /// Whole-file SHA-256 checksum, independent of the chunk boundaries,
    /// used as a cheap equality check during scans without re-chunking.
    pub checksum: [u8; 32],
    pub mtime_seconds: i64,
    pub mtime_nanos: u32,
}

impl WorkspaceEntry {
    /// Equality used by `diff`: content identity only, mtime/mode excluded.
    pub fn content_eq(&self, other: &WorkspaceEntry) -> bool {
        self.file_ref == other.file_ref && self.checksum == other.checksum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDiffEntry {
    pub path: String,
    pub kind: DiffKind,
    pub old: Option<WorkspaceEntry>,
    pub new: Option<WorkspaceEntry>,
}
