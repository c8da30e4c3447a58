//! Storage-level commit operations: sealing a workspace snapshot into a
//! commit object, and reading commits and the trees they reference back
//! out of the CAS.
//!

use crate::core::cas::ContentStore;
use crate::core::hamt;
use crate::core::mmr::{Mmr, MmrLeaf};
use crate::error::StrataError;
use crate::model::dir_entry::DirEntry;
use crate::model::hash::Hash;
use crate::model::{Commit, Identity};

/// Seals a commit: determines the parent MMR position from the first
/// parent (if any), appends an MMR leaf, and stores the canonical commit
/// text in the CAS keyed by its own hash.
#[allow(clippy::too_many_arguments)]
pub fn create_commit(
    cas: &dyn ContentStore,
    mmr: &Mmr,
    timeline: &str,
    tree: Hash,
    parents: Vec<Hash>,
    author: Identity,
    committer: Identity,
    message: String,
    timestamp: time::OffsetDateTime,
) -> Result<Commit, StrataError> {
    let previous_index = match parents.first() {
        Some(parent_hash) => {
            let parent = read_commit(cas, parent_hash)?;
            parent.mmr_position
        }
        None => None,
    };

    let leaf = MmrLeaf {
        tree_root: tree,
        timeline: timeline.to_string(),
        previous_index,
        author: author.clone(),
        unix_time: timestamp.unix_timestamp(),
        message: message.clone(),
    };
    let position = mmr.append(&leaf)?;

    let commit = Commit {
        tree,
        parents,
        author,
        author_timestamp: timestamp,
        committer,
        committer_timestamp: timestamp,
        message,
        mmr_position: Some(position),
    };

    cas.put(&commit.hash(), commit.canonical_text().as_bytes())?;
    Ok(commit)
}

pub fn read_commit(cas: &dyn ContentStore, hash: &Hash) -> Result<Commit, StrataError> {
    let text = cas.get(hash)?;
    let text = std::str::from_utf8(&text)?;
    Commit::from_canonical_text(text)
}

/// The root directory's direct entries.
pub fn read_tree(cas: &dyn ContentStore, commit: &Commit) -> Result<Vec<DirEntry>, StrataError> {
    hamt::list(cas, &commit.tree)
}

pub fn get_file_content(
    cas: &dyn ContentStore,
    commit: &Commit,
    path: &str,
) -> Result<Vec<u8>, StrataError> {
    match hamt::path_lookup(cas, &commit.tree, path)? {
        Some(crate::model::dir_entry::EntryRef::File { hash, .. }) => {
            crate::core::chunk::read_all(cas, &hash)
        }
        Some(_) => Err(StrataError::path_does_not_exist(path)),
        None => Err(StrataError::not_found(format!("path {path}"))),
    }
}

/// Every file path reachable from the commit's root, in HAMT walk order.
pub fn list_files(cas: &dyn ContentStore, commit: &Commit) -> Result<Vec<String>, StrataError> {
    let mut paths = Vec::new();
    hamt::walk(cas, &commit.tree, &mut |path, entry| {
        if matches!(entry, crate::model::dir_entry::EntryRef::File { .. }) {
            paths.push(path.to_string());
        }
        Ok(())
    })?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cas::MemoryCas;
    use crate::core::hamt;
    use crate::db;
    use crate::model::dir_entry::EntryRef;

    fn identity(name: &str) -> Identity {
        Identity {
            name: name.to_string(),
            email: format!("{name}@x"),
        }
    }

    #[test]
    fn test_commit_round_trip_with_nested_tree() {
        let cas = MemoryCas::new();
        let dir = tempfile::tempdir().unwrap();
        let kv = db::open(dir.path().join("mmr.db")).unwrap();
        let mmr = Mmr::new(kv);

        let src_dir = hamt::build(
            &cas,
            vec![
                DirEntry {
                    name: "main.go".to_string(),
                    entry: EntryRef::File {
                        hash: crate::core::chunk::build(&cas, b"package main", 65_536).unwrap(),
                        size: 12,
                    },
                },
                DirEntry {
                    name: "util.go".to_string(),
                    entry: EntryRef::File {
                        hash: crate::core::chunk::build(&cas, b"package main", 65_536).unwrap(),
                        size: 12,
                    },
                },
            ],
        )
        .unwrap();
        let docs_dir = hamt::build(
            &cas,
            vec![DirEntry {
                name: "guide.md".to_string(),
                entry: EntryRef::File {
                    hash: crate::core::chunk::build(&cas, b"# Guide", 65_536).unwrap(),
                    size: 7,
                },
            }],
        )
        .unwrap();

        let root = hamt::build(
            &cas,
            vec![
                DirEntry {
                    name: "README.md".to_string(),
                    entry: EntryRef::File {
                        hash: crate::core::chunk::build(&cas, b"# Test", 65_536).unwrap(),
                        size: 6,
                    },
                },
                DirEntry {
                    name: "src".to_string(),
                    entry: EntryRef::Dir {
                        hash: src_dir,
                        size: 2,
                    },
                },
                DirEntry {
                    name: "docs".to_string(),
                    entry: EntryRef::Dir {
                        hash: docs_dir,
                        size: 1,
                    },
                },
            ],
        )
        .unwrap();

        let commit = create_commit(
            &cas,
            &mmr,
            "main",
            root,
            vec![],
            identity("A"),
            identity("A"),
            "Initial".to_string(),
            time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        )
        .unwrap();

        let read_back = read_commit(&cas, &commit.hash()).unwrap();
        assert_eq!(read_back, commit);

        let tree = read_tree(&cas, &commit).unwrap();
        let names: Vec<&str> = tree.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "docs", "src"]);

        let files = list_files(&cas, &commit).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.contains(&"src/util.go".to_string()));

        let content = get_file_content(&cas, &commit, "src/util.go").unwrap();
        assert_eq!(content, b"package main");
    }
}
