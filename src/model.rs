//! The structs and enums that represent the data in the strata library.
//!

pub mod commit;
pub mod dir_entry;
pub mod hash;
pub mod merge_conflict;
pub mod repository;
pub mod shelf;
pub mod submodule;
pub mod timeline;
pub mod workspace_entry;

pub use crate::model::commit::{Commit, Identity};
pub use crate::model::dir_entry::{DirEntry, EntryRef};
pub use crate::model::hash::Hash;
pub use crate::model::merge_conflict::{
    ChunkChoice, ChunkConflict, FileConflict, FileConflictKind, FileResolutionStatus,
    MergeOutcome, MergeResolution, MergeStrategy,
};
pub use crate::model::repository::LocalRepository;
pub use crate::model::shelf::ShelfRecord;
pub use crate::model::submodule::Submodule;
pub use crate::model::timeline::{Butterfly, Timeline, TimelineKind};
pub use crate::model::workspace_entry::{
    DiffKind, EntryKind, WorkspaceDiffEntry, WorkspaceEntry,
};
