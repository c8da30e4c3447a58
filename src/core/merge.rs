//! Chunk-level three-way merge engine. Resolves each tracked path against
//! the base/ours/theirs resolution matrix, descending into a file's chunk
//! sequence when both sides touched it. Never writes conflict markers into
//! the working tree: unresolved files simply keep their current (ours)
//! content until resolved through a pluggable strategy or `merge_continue`.
//!

use std::collections::{BTreeMap, HashSet};

use crate::core::cas::ContentStore;
use crate::core::{chunk, hamt};
use crate::error::StrataError;
use crate::model::dir_entry::{DirEntry, EntryRef};
use crate::model::hash::Hash;
use crate::model::merge_conflict::{
    ChunkChoice, ChunkConflict, FileConflict, FileConflictKind, MergeOutcome, MergeStrategy,
};
use crate::model::workspace_entry::WorkspaceEntry;

type Index = BTreeMap<String, WorkspaceEntry>;

/// Runs the full three-way merge and returns the merged index root plus
/// any conflicts the strategy could not collapse.
pub fn merge(
    cas: &dyn ContentStore,
    base: &Index,
    ours: &Index,
    theirs: &Index,
    strategy: MergeStrategy,
) -> Result<MergeOutcome, StrataError> {
    merge_with_overrides(cas, base, ours, theirs, strategy, &BTreeMap::new())
}

/// Same resolution matrix as `merge`, but a path present in `overrides`
/// uses its own strategy instead of `default_strategy`. Used by
/// `merge_continue` to re-resolve only the paths a prior `Auto` pass left
/// conflicted, leaving already-resolved paths untouched.
pub fn merge_with_overrides(
    cas: &dyn ContentStore,
    base: &Index,
    ours: &Index,
    theirs: &Index,
    default_strategy: MergeStrategy,
    overrides: &BTreeMap<String, MergeStrategy>,
) -> Result<MergeOutcome, StrataError> {
    let mut paths: Vec<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
    paths.sort();
    paths.dedup();

    let mut entries = Vec::new();
    let mut conflicts = Vec::new();

    for path in paths {
        let b = base.get(path);
        let o = ours.get(path);
        let t = theirs.get(path);
        let strategy = overrides.get(path).copied().unwrap_or(default_strategy);

        match resolve_path(cas, path, b, o, t, strategy)? {
            Resolution::Absent => {}
            Resolution::Present(file_ref, size) => entries.push(DirEntry {
                name: path.clone(),
                entry: EntryRef::File {
                    hash: file_ref,
                    size,
                },
            }),
            Resolution::Conflicted(file_ref, size, conflict) => {
                conflicts.push(conflict);
                if let Some(file_ref) = file_ref {
                    entries.push(DirEntry {
                        name: path.clone(),
                        entry: EntryRef::File {
                            hash: file_ref,
                            size,
                        },
                    });
                }
            }
        }
    }

    let index_root = hamt::build(cas, entries)?;
    Ok(MergeOutcome {
        index_root,
        conflicts,
    })
}

enum Resolution {
    Absent,
    Present(Hash, u64),
    /// Kept at its current (`ours`) content pending resolution, alongside
    /// the conflict recorded for the caller.
    Conflicted(Option<Hash>, u64, FileConflict),
}

fn resolve_path(
    cas: &dyn ContentStore,
    path: &str,
    b: Option<&WorkspaceEntry>,
    o: Option<&WorkspaceEntry>,
    t: Option<&WorkspaceEntry>,
    strategy: MergeStrategy,
) -> Result<Resolution, StrataError> {
    match (b, o, t) {
        (None, None, None) => Ok(Resolution::Absent),
        (None, Some(o), None) => Ok(Resolution::Present(o.file_ref, o.size)),
        (None, None, Some(t)) => Ok(Resolution::Present(t.file_ref, t.size)),
        (Some(_), None, None) => Ok(Resolution::Absent),

        (Some(base), Some(ours), None) => {
            if ours.file_ref == base.file_ref {
                Ok(Resolution::Absent)
            } else {
                resolve_delete_vs_modify(path, Some(ours), None, strategy)
            }
        }
        (Some(base), None, Some(theirs)) => {
            if theirs.file_ref == base.file_ref {
                Ok(Resolution::Absent)
            } else {
                resolve_delete_vs_modify(path, None, Some(theirs), strategy)
            }
        }

        (None, Some(ours), Some(theirs)) => {
            if ours.file_ref == theirs.file_ref {
                return Ok(Resolution::Present(ours.file_ref, ours.size));
            }
            resolve_chunk_merge(cas, path, &[], ours, theirs, strategy)
        }
        (Some(base), Some(ours), Some(theirs)) => {
            if ours.file_ref == theirs.file_ref {
                return Ok(Resolution::Present(ours.file_ref, ours.size));
            }
            let base_chunks = chunk::leaf_hashes(cas, &base.file_ref)?;
            resolve_chunk_merge(cas, path, &base_chunks, ours, theirs, strategy)
        }
    }
}

fn resolve_delete_vs_modify(
    path: &str,
    ours: Option<&WorkspaceEntry>,
    theirs: Option<&WorkspaceEntry>,
    strategy: MergeStrategy,
) -> Result<Resolution, StrataError> {
    let modified = ours.or(theirs).expect("one side always modified here");
    let conflict = FileConflict {
        path: path.to_string(),
        kind: FileConflictKind::DeleteVsModify,
    };

    match strategy {
        MergeStrategy::Ours => match ours {
            Some(entry) => Ok(Resolution::Present(entry.file_ref, entry.size)),
            None => Ok(Resolution::Absent),
        },
        MergeStrategy::Theirs => match theirs {
            Some(entry) => Ok(Resolution::Present(entry.file_ref, entry.size)),
            None => Ok(Resolution::Absent),
        },
        MergeStrategy::Base | MergeStrategy::Union => {
            Ok(Resolution::Present(modified.file_ref, modified.size))
        }
        MergeStrategy::Auto => Ok(Resolution::Conflicted(
            ours.map(|e| e.file_ref),
            ours.map(|e| e.size).unwrap_or(0),
            conflict,
        )),
    }
}

fn resolve_chunk_merge(
    cas: &dyn ContentStore,
    path: &str,
    base_chunks: &[Hash],
    ours: &WorkspaceEntry,
    theirs: &WorkspaceEntry,
    strategy: MergeStrategy,
) -> Result<Resolution, StrataError> {
    let ours_chunks = chunk::leaf_hashes(cas, &ours.file_ref)?;
    let theirs_chunks = chunk::leaf_hashes(cas, &theirs.file_ref)?;

    if strategy != MergeStrategy::Auto {
        let resolved = apply_strategy(strategy, base_chunks, &ours_chunks, &theirs_chunks);
        let file_ref = chunk::rebuild_from_leaves(cas, &resolved)?;
        let size = chunk::read_all(cas, &file_ref)?.len() as u64;
        return Ok(Resolution::Present(file_ref, size));
    }

    let width = base_chunks.len().max(ours_chunks.len()).max(theirs_chunks.len());
    let mut resolved_chunks = Vec::with_capacity(width);
    let mut chunk_conflicts = Vec::new();

    for i in 0..width {
        let b = base_chunks.get(i).copied();
        let o = ours_chunks.get(i).copied();
        let t = theirs_chunks.get(i).copied();

        match chunk_choice(b, o, t) {
            Some(choice) => {
                if let Some(hash) = choice {
                    resolved_chunks.push(hash);
                }
            }
            None => {
                chunk_conflicts.push(ChunkConflict {
                    chunk_index: i,
                    base: b,
                    ours: o,
                    theirs: t,
                });
                // Keep `ours` at this position until the conflict resolves.
                if let Some(hash) = o {
                    resolved_chunks.push(hash);
                }
            }
        }
    }

    if chunk_conflicts.is_empty() {
        let file_ref = chunk::rebuild_from_leaves(cas, &resolved_chunks)?;
        let bytes_len = chunk::read_all(cas, &file_ref)?.len() as u64;
        Ok(Resolution::Present(file_ref, bytes_len))
    } else {
        let file_ref = chunk::rebuild_from_leaves(cas, &resolved_chunks)?;
        let bytes_len = chunk::read_all(cas, &file_ref)?.len() as u64;
        Ok(Resolution::Conflicted(
            Some(file_ref),
            bytes_len,
            FileConflict {
                path: path.to_string(),
                kind: FileConflictKind::Chunk(chunk_conflicts),
            },
        ))
    }
}

/// Resolves one chunk position. The outer `Option` is `None` for a real
/// conflict; the inner `Option<Hash>` is the winning chunk, which is
/// itself `None` when the position is absent on the winning side (e.g.
/// past the end of a shorter file).
fn chunk_choice(base: Option<Hash>, ours: Option<Hash>, theirs: Option<Hash>) -> Option<Option<Hash>> {
    if ours == theirs {
        return Some(ours);
    }
    if base == ours {
        return Some(theirs);
    }
    if base == theirs {
        return Some(ours);
    }
    None
}

fn apply_strategy(
    strategy: MergeStrategy,
    base_chunks: &[Hash],
    ours_chunks: &[Hash],
    theirs_chunks: &[Hash],
) -> Vec<Hash> {
    match strategy {
        MergeStrategy::Ours => ours_chunks.to_vec(),
        MergeStrategy::Theirs => theirs_chunks.to_vec(),
        MergeStrategy::Base => base_chunks.to_vec(),
        MergeStrategy::Union => {
            let base_set: HashSet<Hash> = base_chunks.iter().copied().collect();
            let mut seen = HashSet::new();
            let mut result = Vec::new();
            for hash in ours_chunks.iter().chain(theirs_chunks.iter()) {
                if base_set.contains(hash) {
                    continue;
                }
                if seen.insert(*hash) {
                    result.push(*hash);
                }
            }
            if result.is_empty() {
                base_chunks.to_vec()
            } else {
                result
            }
        }
        MergeStrategy::Auto => ours_chunks.to_vec(),
    }
}

/// Applies a per-chunk choice recorded in a persisted `MergeResolution`
/// to an in-progress file's chunk sequence, used by
/// `repositories::merge_continue_chunks` to honor a chunk-granular
/// resolution instead of re-running the whole-file strategy matrix.
pub fn apply_chunk_choices(
    cas: &dyn ContentStore,
    base_chunks: &[Hash],
    ours_chunks: &[Hash],
    theirs_chunks: &[Hash],
    choices: &BTreeMap<usize, ChunkChoice>,
) -> Result<Hash, StrataError> {
    let width = base_chunks.len().max(ours_chunks.len()).max(theirs_chunks.len());
    let mut resolved = Vec::with_capacity(width);
    for i in 0..width {
        let b = base_chunks.get(i).copied();
        let o = ours_chunks.get(i).copied();
        let t = theirs_chunks.get(i).copied();
        let chosen = match choices.get(&i) {
            Some(ChunkChoice::Base) => b,
            Some(ChunkChoice::Ours) => o,
            Some(ChunkChoice::Theirs) => t,
            None => match chunk_choice(b, o, t) {
                Some(choice) => choice,
                None => o,
            },
        };
        if let Some(hash) = chosen {
            resolved.push(hash);
        }
    }
    chunk::rebuild_from_leaves(cas, &resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cas::MemoryCas;
    use crate::model::workspace_entry::EntryKind;

    fn entry(cas: &MemoryCas, content: &[u8]) -> WorkspaceEntry {
        let file_ref = chunk::build(cas, content, 4).unwrap();
        WorkspaceEntry {
            path: String::new(),
            kind: EntryKind::File,
            file_ref,
            mode: 0o644,
            size: content.len() as u64,
            checksum: [0u8; 32],
            mtime_seconds: 0,
            mtime_nanos: 0,
        }
    }

    #[test]
    fn test_merge_equal_sides_is_clean() {
        let cas = MemoryCas::new();
        let mut base = Index::new();
        let mut ours = Index::new();
        let mut theirs = Index::new();
        base.insert("a.txt".to_string(), entry(&cas, b"base"));
        ours.insert("a.txt".to_string(), entry(&cas, b"same"));
        theirs.insert("a.txt".to_string(), entry(&cas, b"same"));

        let outcome = merge(&cas, &base, &ours, &theirs, MergeStrategy::Auto).unwrap();
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_chunk_merge_without_conflict() {
        let cas = MemoryCas::new();
        let mut base = Index::new();
        let mut ours = Index::new();
        let mut theirs = Index::new();
        // Leaf size 4: base "XXXXYYYYZZZZ" -> [XXXX, YYYY, ZZZZ]
        base.insert("f".to_string(), entry(&cas, b"XXXXYYYYZZZZ"));
        ours.insert("f".to_string(), entry(&cas, b"xxxxYYYYZZZZ"));
        theirs.insert("f".to_string(), entry(&cas, b"XXXXYYYYzzzz"));

        let outcome = merge(&cas, &base, &ours, &theirs, MergeStrategy::Auto).unwrap();
        assert!(outcome.conflicts.is_empty());

        let files = hamt::list(&cas, &outcome.index_root).unwrap();
        let file_ref = files[0].entry.hash();
        let content = chunk::read_all(&cas, &file_ref).unwrap();
        assert_eq!(content, b"xxxxYYYYzzzz");
    }

    #[test]
    fn test_chunk_merge_with_conflict() {
        let cas = MemoryCas::new();
        let mut base = Index::new();
        let mut ours = Index::new();
        let mut theirs = Index::new();
        base.insert("f".to_string(), entry(&cas, b"XXXX"));
        ours.insert("f".to_string(), entry(&cas, b"oooo"));
        theirs.insert("f".to_string(), entry(&cas, b"tttt"));

        let outcome = merge(&cas, &base, &ours, &theirs, MergeStrategy::Auto).unwrap();
        assert_eq!(outcome.conflicts.len(), 1);
        match &outcome.conflicts[0].kind {
            FileConflictKind::Chunk(chunks) => assert_eq!(chunks.len(), 1),
            _ => panic!("expected chunk conflict"),
        }
    }

    #[test]
    fn test_delete_vs_modify_conflict_with_auto() {
        let cas = MemoryCas::new();
        let mut base = Index::new();
        let mut ours = Index::new();
        let theirs = Index::new();
        base.insert("f".to_string(), entry(&cas, b"base"));
        ours.insert("f".to_string(), entry(&cas, b"modified"));

        let outcome = merge(&cas, &base, &ours, &theirs, MergeStrategy::Auto).unwrap();
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(matches!(
            outcome.conflicts[0].kind,
            FileConflictKind::DeleteVsModify
        ));
    }
}
