//! The workspace index: a HAMT-encoded map from tracked path to file
//! metadata. The index root hash is a full identity of a workspace
//! snapshot and is what the switch engine and merge engine consume.
//!

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use time::OffsetDateTime;

use crate::core::cas::ContentStore;
use crate::core::{chunk, hamt};
use crate::error::StrataError;
use crate::model::dir_entry::{DirEntry, EntryRef};
use crate::model::hash::Hash;
use crate::model::workspace_entry::{DiffKind, EntryKind, WorkspaceDiffEntry, WorkspaceEntry};
use crate::util;
use crate::util::concurrency::num_threads_for_items;

/// Walks `root_dir`, skipping paths for which `should_skip` returns true
/// (always including the repository's own hidden directory), building a
/// chunk tree for every regular file and assembling the results into a
/// HAMT. Returns the index root hash and the flat metadata list.
pub fn scan(
    cas: &dyn ContentStore,
    root_dir: &Path,
    should_skip: &(dyn Fn(&Path) -> bool + Sync),
) -> Result<(Hash, Vec<WorkspaceEntry>), StrataError> {
    scan_with_chunk_size(cas, root_dir, should_skip, crate::constants::DEFAULT_CHUNK_SIZE)
}

/// Same as [`scan`], but builds each file's chunk tree with `chunk_size`
/// leaves instead of the crate default. Callers driving a repository
/// should pass `repo.config.chunk_size()` rather than this directly.
pub fn scan_with_chunk_size(
    cas: &dyn ContentStore,
    root_dir: &Path,
    should_skip: &(dyn Fn(&Path) -> bool + Sync),
    chunk_size: u64,
) -> Result<(Hash, Vec<WorkspaceEntry>), StrataError> {
    let files: Vec<_> = util::fs::rlist_files_in_dir(root_dir)
        .into_iter()
        .filter(|path| !should_skip(path))
        .collect();

    let num_threads = num_threads_for_items(files.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| StrataError::basic_str(e.to_string()))?;

    let entries: Vec<WorkspaceEntry> = pool.install(|| {
        files
            .par_iter()
            .map(|path| scan_one(cas, root_dir, path, chunk_size))
            .collect::<Result<Vec<_>, StrataError>>()
    })?;

    let dir_entries: Vec<DirEntry> = entries
        .iter()
        .map(|entry| DirEntry {
            name: entry.path.clone(),
            entry: EntryRef::File {
                hash: entry.file_ref,
                size: entry.size,
            },
        })
        .collect();

    let root = hamt::build(cas, dir_entries)?;
    Ok((root, entries))
}

fn scan_one(
    cas: &dyn ContentStore,
    root_dir: &Path,
    path: &Path,
    chunk_size: u64,
) -> Result<WorkspaceEntry, StrataError> {
    let bytes = util::fs::read_bytes_from_path(path)?;
    let file_ref = chunk::build(cas, &bytes, chunk_size)?;
    let checksum = crate::util::hasher::sha256_buffer(&bytes);
    let metadata = util::fs::open_file(path)?
        .metadata()
        .map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))?;

    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode()
    };
    #[cfg(not(unix))]
    let mode = 0o644u32;

    let modified = metadata
        .modified()
        .map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))?;
    let mtime: OffsetDateTime = modified.into();

    Ok(WorkspaceEntry {
        path: util::fs::to_relative_forward_slash(root_dir, path)?,
        kind: EntryKind::File,
        file_ref,
        mode,
        size: bytes.len() as u64,
        checksum,
        mtime_seconds: mtime.unix_timestamp(),
        mtime_nanos: mtime.nanosecond(),
    })
}

/// Flattens a workspace-index HAMT into a path-keyed map, reconstructing
/// the metadata this module originally produced from the HAMT entry plus
/// a re-read of the file's own size (mode/mtime are not recoverable from
/// the HAMT alone and default to zero when the index is read back rather
/// than retained from a fresh scan).
pub fn list_entries(
    cas: &dyn ContentStore,
    index_root: &Hash,
) -> Result<BTreeMap<String, WorkspaceEntry>, StrataError> {
    let mut out = BTreeMap::new();
    for entry in hamt::list(cas, index_root)? {
        if let EntryRef::File { hash, size } = entry.entry {
            out.insert(
                entry.name.clone(),
                WorkspaceEntry {
                    path: entry.name,
                    kind: EntryKind::File,
                    file_ref: hash,
                    mode: 0o644,
                    size,
                    checksum: [0u8; 32],
                    mtime_seconds: 0,
                    mtime_nanos: 0,
                },
            );
        }
    }
    Ok(out)
}

/// Flattens a committed (nested, per-directory) tree into the same
/// path-keyed shape as a workspace index, for diffing a timeline's
/// committed state against a workspace index. Metadata not carried by a
/// tree entry (mode/checksum/mtime) defaults the same way `list_entries`
/// does.
pub fn flatten_tree(
    cas: &dyn ContentStore,
    tree_root: &Hash,
) -> Result<BTreeMap<String, WorkspaceEntry>, StrataError> {
    let mut out = BTreeMap::new();
    hamt::walk(cas, tree_root, &mut |path, entry_ref| {
        if let EntryRef::File { hash, size } = entry_ref {
            out.insert(
                path.to_string(),
                WorkspaceEntry {
                    path: path.to_string(),
                    kind: EntryKind::File,
                    file_ref: *hash,
                    mode: 0o644,
                    size: *size,
                    checksum: [0u8; 32],
                    mtime_seconds: 0,
                    mtime_nanos: 0,
                },
            );
        }
        Ok(())
    })?;
    Ok(out)
}

pub fn lookup(
    cas: &dyn ContentStore,
    index_root: &Hash,
    path: &str,
) -> Result<Option<WorkspaceEntry>, StrataError> {
    Ok(list_entries(cas, index_root)?.remove(path))
}

/// Diffs two path-keyed snapshots. Equality uses the file-ref hash and
/// checksum only; mtime and mode are informational and excluded.
pub fn diff(
    old: &BTreeMap<String, WorkspaceEntry>,
    new: &BTreeMap<String, WorkspaceEntry>,
) -> Vec<WorkspaceDiffEntry> {
    let mut out = Vec::new();
    for (path, new_entry) in new {
        match old.get(path) {
            None => out.push(WorkspaceDiffEntry {
                path: path.clone(),
                kind: DiffKind::Added,
                old: None,
                new: Some(new_entry.clone()),
            }),
            Some(old_entry) => {
                if !old_entry.content_eq(new_entry) {
                    out.push(WorkspaceDiffEntry {
                        path: path.clone(),
                        kind: DiffKind::Modified,
                        old: Some(old_entry.clone()),
                        new: Some(new_entry.clone()),
                    });
                }
            }
        }
    }
    for (path, old_entry) in old {
        if !new.contains_key(path) {
            out.push(WorkspaceDiffEntry {
                path: path.clone(),
                kind: DiffKind::Removed,
                old: Some(old_entry.clone()),
                new: None,
            });
        }
    }
    out
}

/// Writes every file referenced by `index_root` into `dest_dir`, creating
/// parent directories as needed and setting mode/mtime from the metadata
/// when it is available (a freshly scanned index, not one read back from
/// `list_entries`).
pub fn materialize(
    cas: &dyn ContentStore,
    index_root: &Hash,
    dest_dir: &Path,
) -> Result<(), StrataError> {
    hamt::walk(cas, index_root, &mut |path, entry_ref| {
        if let EntryRef::File { hash, .. } = entry_ref {
            let bytes = chunk::read_all(cas, hash)?;
            let dest = dest_dir.join(path);
            util::fs::write_data(&dest, &bytes)?;
        }
        Ok(())
    })
}

/// Groups a flat workspace index into the nested, per-directory HAMT a
/// commit's `tree` field expects: one HAMT per directory, bottom-up, with
/// subdirectories referenced as `Dir` entries in their parent's HAMT.
pub fn build_tree(
    cas: &dyn ContentStore,
    files: &BTreeMap<String, WorkspaceEntry>,
) -> Result<Hash, StrataError> {
    build_tree_level(cas, files, "")
}

fn build_tree_level(
    cas: &dyn ContentStore,
    files: &BTreeMap<String, WorkspaceEntry>,
    prefix: &str,
) -> Result<Hash, StrataError> {
    let mut direct_files = Vec::new();
    let mut subdirs: BTreeMap<String, BTreeMap<String, WorkspaceEntry>> = BTreeMap::new();

    for (path, entry) in files {
        let rest = match prefix.is_empty() {
            true => path.as_str(),
            false => match path.strip_prefix(prefix).and_then(|p| p.strip_prefix('/')) {
                Some(rest) => rest,
                None => continue,
            },
        };
        match rest.split_once('/') {
            None => direct_files.push(DirEntry {
                name: rest.to_string(),
                entry: EntryRef::File {
                    hash: entry.file_ref,
                    size: entry.size,
                },
            }),
            Some((dir, _)) => {
                let full_prefix = if prefix.is_empty() {
                    dir.to_string()
                } else {
                    format!("{prefix}/{dir}")
                };
                subdirs.entry(full_prefix).or_default().insert(path.clone(), entry.clone());
            }
        }
    }

    let mut entries = direct_files;
    for (full_prefix, subdir_files) in &subdirs {
        let name = full_prefix.rsplit('/').next().unwrap_or(full_prefix).to_string();
        let hash = build_tree_level(cas, subdir_files, full_prefix)?;
        let size = subdir_files.len() as u64;
        entries.push(DirEntry {
            name,
            entry: EntryRef::Dir { hash, size },
        });
    }

    hamt::build(cas, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cas::MemoryCas;

    #[test]
    fn test_build_tree_groups_nested_directories() {
        let cas = MemoryCas::new();
        let mut files = BTreeMap::new();
        for (path, content) in [
            ("README.md", b"# Test".as_slice()),
            ("src/main.go", b"package main".as_slice()),
            ("src/util.go", b"package main".as_slice()),
            ("docs/guide.md", b"# Guide".as_slice()),
        ] {
            files.insert(
                path.to_string(),
                WorkspaceEntry {
                    path: path.to_string(),
                    kind: EntryKind::File,
                    file_ref: chunk::build(&cas, content, 65_536).unwrap(),
                    mode: 0o644,
                    size: content.len() as u64,
                    checksum: [0u8; 32],
                    mtime_seconds: 0,
                    mtime_nanos: 0,
                },
            );
        }

        let root = build_tree(&cas, &files).unwrap();
        let top = hamt::list(&cas, &root).unwrap();
        let names: Vec<&str> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "docs", "src"]);

        let src_entry = top.iter().find(|e| e.name == "src").unwrap();
        let src_files = hamt::list(&cas, &src_entry.entry.hash()).unwrap();
        assert_eq!(src_files.len(), 2);
    }

    #[test]
    fn test_diff_added_modified_removed() {
        let cas = MemoryCas::new();
        let mut old = BTreeMap::new();
        old.insert(
            "a.txt".to_string(),
            WorkspaceEntry {
                path: "a.txt".to_string(),
                kind: EntryKind::File,
                file_ref: chunk::build(&cas, b"1", 65_536).unwrap(),
                mode: 0o644,
                size: 1,
                checksum: [0u8; 32],
                mtime_seconds: 0,
                mtime_nanos: 0,
            },
        );
        old.insert(
            "gone.txt".to_string(),
            WorkspaceEntry {
                path: "gone.txt".to_string(),
                kind: EntryKind::File,
                file_ref: chunk::build(&cas, b"gone", 65_536).unwrap(),
                mode: 0o644,
                size: 4,
                checksum: [0u8; 32],
                mtime_seconds: 0,
                mtime_nanos: 0,
            },
        );

        let mut new = BTreeMap::new();
        new.insert(
            "a.txt".to_string(),
            WorkspaceEntry {
                path: "a.txt".to_string(),
                kind: EntryKind::File,
                file_ref: chunk::build(&cas, b"2", 65_536).unwrap(),
                mode: 0o644,
                size: 1,
                checksum: [0u8; 32],
                mtime_seconds: 0,
                mtime_nanos: 0,
            },
        );
        new.insert(
            "b.txt".to_string(),
            WorkspaceEntry {
                path: "b.txt".to_string(),
                kind: EntryKind::File,
                file_ref: chunk::build(&cas, b"new", 65_536).unwrap(),
                mode: 0o644,
                size: 3,
                checksum: [0u8; 32],
                mtime_seconds: 0,
                mtime_nanos: 0,
            },
        );

        let changes = diff(&old, &new);
        let kinds: Vec<(&str, DiffKind)> = changes
            .iter()
            .map(|c| (c.path.as_str(), c.kind))
            .collect();
        assert!(kinds.contains(&("a.txt", DiffKind::Modified)));
        assert!(kinds.contains(&("b.txt", DiffKind::Added)));
        assert!(kinds.contains(&("gone.txt", DiffKind::Removed)));
    }
}
