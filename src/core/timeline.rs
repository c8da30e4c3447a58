//! The timeline switch engine: scans the working tree, shelves the
//! outgoing timeline's divergence, resolves the incoming timeline's
//! workspace state (from an auto-shelf if one exists, else its committed
//! tree), diffs the two, and applies the result to the working tree.
//!
//! Ordering is CAS writes (already durable from the scan) → ref/shelf
//! updates → HEAD update, so a crash mid-switch never leaves HEAD
//! pointing at a timeline whose workspace wasn't actually materialized.
//!

use std::path::Path;

use crate::core::cas::ContentStore;
use crate::core::commit;
use crate::core::refs::RefStore;
use crate::core::shelf::ShelfManager;
use crate::core::workspace_index;
use crate::error::StrataError;
use crate::model::workspace_entry::DiffKind;

pub struct SwitchOutcome {
    pub from: Option<String>,
    pub to: String,
    pub files_written: usize,
    pub files_removed: usize,
}

/// Switches the working tree from whatever timeline HEAD currently names
/// to `target`, following the seven-step procedure: load refs, scan,
/// auto-shelve the outgoing divergence, resolve the incoming state,
/// diff, apply, update HEAD.
pub fn switch(
    cas: &dyn ContentStore,
    refs: &RefStore,
    shelves: &ShelfManager,
    root_dir: &Path,
    target: &str,
    should_skip: &(dyn Fn(&Path) -> bool + Sync),
    chunk_size: u64,
) -> Result<SwitchOutcome, StrataError> {
    use crate::model::TimelineKind;

    let target_timeline = refs
        .get(TimelineKind::Local, target)?
        .ok_or_else(|| StrataError::timeline_not_found(target))?;
    let current_timeline = refs.get_current_timeline()?;
    let current_name = current_timeline.as_ref().map(|t| t.name.clone());

    let (current_ws_root, _) =
        workspace_index::scan_with_chunk_size(cas, root_dir, should_skip, chunk_size)?;
    let current_ws_index = workspace_index::list_entries(cas, &current_ws_root)?;

    if let Some(current_name) = &current_name {
        if current_name != target {
            shelves.shelve_auto(current_name, current_ws_root)?;
        }
    }

    let target_index = match shelves.get_auto(target)? {
        Some(record) => {
            shelves.drop_shelf(&record.id)?;
            workspace_index::list_entries(cas, &record.index_root)?
        }
        None => {
            let target_commit = commit::read_commit(cas, &target_timeline.commit_hash)?;
            workspace_index::flatten_tree(cas, &target_commit.tree)?
        }
    };

    let diff = workspace_index::diff(&current_ws_index, &target_index);

    let mut files_written = 0;
    let mut files_removed = 0;
    for change in &diff {
        match change.kind {
            DiffKind::Added | DiffKind::Modified => {
                let entry = change
                    .new
                    .as_ref()
                    .expect("added/modified diff entries always carry a new value");
                let bytes = crate::core::chunk::read_all(cas, &entry.file_ref)?;
                let dest = root_dir.join(&entry.path);
                crate::util::fs::write_data(&dest, &bytes)?;
                files_written += 1;
            }
            DiffKind::Removed => {
                let entry = change
                    .old
                    .as_ref()
                    .expect("removed diff entries always carry an old value");
                let dest = root_dir.join(&entry.path);
                if dest.exists() {
                    crate::util::fs::remove_file(&dest)?;
                }
                files_removed += 1;
                prune_empty_parents(&dest, root_dir);
            }
        }
    }

    refs.set_head(target)?;

    Ok(SwitchOutcome {
        from: current_name,
        to: target.to_string(),
        files_written,
        files_removed,
    })
}

/// Removes now-empty directories walking upward from a deleted file's
/// parent, stopping at the working-tree root.
fn prune_empty_parents(deleted_file: &Path, root_dir: &Path) {
    let mut dir = match deleted_file.parent() {
        Some(dir) => dir.to_path_buf(),
        None => return,
    };
    while dir != root_dir && dir.starts_with(root_dir) {
        match std::fs::read_dir(&dir) {
            Ok(mut entries) if entries.next().is_none() => {
                if std::fs::remove_dir(&dir).is_err() {
                    break;
                }
                match dir.parent() {
                    Some(parent) => dir = parent.to_path_buf(),
                    None => break,
                }
            }
            _ => break,
        }
    }
}
