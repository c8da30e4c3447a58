//! Types produced and consumed by the chunk-level three-way merge engine,
//! including the `MERGE_RESOLUTION` document persisted while conflicts
//! remain unresolved.
//!

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::hash::Hash;

/// Pluggable strategies that collapse conflicts without user input.
/// A closed enum rather than a trait object, so the known set stays
/// exhaustively matchable and new strategies are added by editing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MergeStrategy {
    #[default]
    Auto,
    Ours,
    Theirs,
    Union,
    Base,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConflict {
    pub chunk_index: usize,
    pub base: Option<Hash>,
    pub ours: Option<Hash>,
    pub theirs: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileConflictKind {
    /// Chunk-level conflicts inside an otherwise-mergeable file.
    Chunk(Vec<ChunkConflict>),
    /// One side deleted the file while the other modified it.
    DeleteVsModify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConflict {
    pub path: String,
    pub kind: FileConflictKind,
}

/// Per-file status recorded inside a persisted `MergeResolution`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResolutionStatus {
    pub path: String,
    pub strategy: MergeStrategy,
    pub resolved: bool,
    /// Per-chunk choice, keyed by chunk index, only populated for files
    /// with chunk-level conflicts once a resolution has been chosen.
    pub chunk_choices: std::collections::BTreeMap<usize, ChunkChoice>,
    pub result_hash: Option<Hash>,
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkChoice {
    Base,
    Ours,
    Theirs,
}

/// The `MERGE_RESOLUTION` document: naming source/target timelines and
/// commits, the global strategy, and per-file status. Written under the
/// repository metadata directory whenever a merge leaves conflicts
/// unresolved; archived to `merge-history/` on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResolution {
    pub source_timeline: String,
    pub target_timeline: String,
    pub source_commit: Hash,
    pub target_commit: Hash,
    pub base_commit: Hash,
    pub strategy: MergeStrategy,
    pub files: Vec<FileResolutionStatus>,
    #[serde(with = "time::serde::timestamp")]
    pub started_at: OffsetDateTime,
}

impl MergeResolution {
    pub fn unresolved_paths(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| !f.resolved)
            .map(|f| f.path.as_str())
            .collect()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.files.iter().all(|f| f.resolved)
    }
}

/// Outcome of a merge operation: the merged workspace-index root and any
/// conflicts the chosen strategy could not collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub index_root: Hash,
    pub conflicts: Vec<FileConflict>,
}
