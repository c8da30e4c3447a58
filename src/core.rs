//! The storage and history core: content-addressed objects, the chunked
//! file and HAMT directory codecs built on top of them, the workspace
//! index, the commit/MMR history log, the ref store, the shelf manager,
//! the timeline switch engine, and the chunk-level merge engine.
//!

pub mod cas;
pub mod chunk;
pub mod commit;
pub mod git_map;
pub mod hamt;
pub mod merge;
pub mod mmr;
pub mod refs;
pub mod shelf;
pub mod timeline;
pub mod workspace_index;
