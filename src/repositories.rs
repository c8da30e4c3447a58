//! The caller-facing surface: the operations a CLI or other collaborator
//! calls to drive the storage and history core. Every operation here is a
//! thin composition of the `core` subsystems over one `LocalRepository`.
//!

use std::collections::BTreeMap;
use std::path::Path;

use crate::constants;
use crate::core::cas::{ContentStore, DiskCas};
use crate::core::git_map::GitMap;
use crate::core::mmr::Mmr;
use crate::core::refs::RefStore;
use crate::core::shelf::ShelfManager;
use crate::core::timeline::{switch as switch_engine, SwitchOutcome};
use crate::core::{chunk, commit, hamt, merge, workspace_index};
use crate::error::StrataError;
use crate::model::dir_entry::{DirEntry, EntryRef};
use crate::model::hash::Hash;
use crate::model::merge_conflict::{
    ChunkChoice, FileResolutionStatus, MergeOutcome, MergeResolution, MergeStrategy,
};
use crate::model::{Butterfly, Commit, Identity, LocalRepository, ShelfRecord, Timeline, TimelineKind};
use crate::util;

/// Creates `<root>/.strata`, an empty object store, an empty ref store,
/// and points HEAD at the default timeline name (an unborn timeline: no
/// commit exists for it yet until the first `create_commit`).
pub fn init(root_dir: impl AsRef<Path>) -> Result<LocalRepository, StrataError> {
    let root_dir = root_dir.as_ref();
    let repo = LocalRepository::new(root_dir)?;
    util::fs::create_dir_all(repo.hidden_dir())?;
    util::fs::create_dir_all(repo.objects_dir())?;
    repo.save_config()?;
    refs_store(&repo)?.set_head(constants::DEFAULT_TIMELINE_NAME)?;
    Ok(repo)
}

fn cas(repo: &LocalRepository) -> DiskCas {
    DiskCas::new(repo.objects_dir())
}

fn refs_store(repo: &LocalRepository) -> Result<RefStore, StrataError> {
    Ok(RefStore::new(crate::db::open(
        repo.hidden_dir().join(constants::REFS_DB),
    )?))
}

fn shelf_manager(repo: &LocalRepository) -> Result<ShelfManager, StrataError> {
    Ok(ShelfManager::new(crate::db::open(
        repo.hidden_dir().join(constants::SHELF_DB),
    )?))
}

fn mmr_log(repo: &LocalRepository) -> Result<Mmr, StrataError> {
    Ok(Mmr::new(crate::db::open(
        repo.hidden_dir().join(constants::MMR_DB),
    )?))
}

fn git_map(repo: &LocalRepository) -> Result<GitMap, StrataError> {
    Ok(GitMap::new(crate::db::open(
        repo.hidden_dir().join(constants::GIT_MAP_DB),
    )?))
}

pub fn lookup_git_sha1(repo: &LocalRepository, blake3: &Hash) -> Result<Option<[u8; 20]>, StrataError> {
    git_map(repo)?.lookup_git_sha1(blake3)
}

pub fn lookup_blake3(repo: &LocalRepository, git_sha1: &[u8; 20]) -> Result<Option<Hash>, StrataError> {
    git_map(repo)?.lookup_blake3(git_sha1)
}

fn no_skip(_: &Path) -> bool {
    false
}

/// Scans the working tree and returns its workspace-index root hash.
/// Pattern-based ignore matching is a caller concern; pass `should_skip`
/// to compose it, or `None` to track every file under the working tree.
pub fn scan_workspace(
    repo: &LocalRepository,
    should_skip: Option<&(dyn Fn(&Path) -> bool + Sync)>,
) -> Result<Hash, StrataError> {
    let skip = should_skip.unwrap_or(&no_skip);
    let store = cas(repo);
    let (root, _) =
        workspace_index::scan_with_chunk_size(&store, &repo.path, skip, repo.config.chunk_size())?;
    Ok(root)
}

/// Seals the current working tree into a commit: scans, groups files into
/// a nested per-directory tree, determines the parent MMR position from
/// the first parent, and appends an MMR leaf.
pub fn create_commit(
    repo: &LocalRepository,
    timeline: &str,
    parents: Vec<Hash>,
    author: Identity,
    committer: Identity,
    message: String,
) -> Result<Commit, StrataError> {
    let store = cas(repo);
    let (_, entries) =
        workspace_index::scan_with_chunk_size(&store, &repo.path, &no_skip, repo.config.chunk_size())?;
    let flat = entries
        .into_iter()
        .map(|e| (e.path.clone(), e))
        .collect::<std::collections::BTreeMap<_, _>>();
    let tree = workspace_index::build_tree(&store, &flat)?;
    let mmr = mmr_log(repo)?;
    commit::create_commit(
        &store,
        &mmr,
        timeline,
        tree,
        parents,
        author,
        committer,
        message,
        time::OffsetDateTime::now_utc(),
    )
}

pub fn read_commit(repo: &LocalRepository, hash: &Hash) -> Result<Commit, StrataError> {
    commit::read_commit(&cas(repo), hash)
}

pub fn read_tree(repo: &LocalRepository, commit: &Commit) -> Result<Vec<DirEntry>, StrataError> {
    commit::read_tree(&cas(repo), commit)
}

pub fn get_file_content(
    repo: &LocalRepository,
    commit: &Commit,
    path: &str,
) -> Result<Vec<u8>, StrataError> {
    commit::get_file_content(&cas(repo), commit, path)
}

pub fn list_files(repo: &LocalRepository, commit: &Commit) -> Result<Vec<String>, StrataError> {
    commit::list_files(&cas(repo), commit)
}

pub fn create_timeline(
    repo: &LocalRepository,
    name: &str,
    kind: TimelineKind,
    commit_hash: Hash,
    description: String,
) -> Result<Timeline, StrataError> {
    let mut timeline = Timeline::new(name, kind, commit_hash);
    timeline.description = description;
    refs_store(repo)?.create(&timeline)?;
    Ok(timeline)
}

/// Creates a local timeline as an experimental branch of `parent`, recording
/// the commit it diverged from alongside the new timeline itself.
pub fn create_butterfly(
    repo: &LocalRepository,
    name: &str,
    parent: &str,
    description: String,
) -> Result<Butterfly, StrataError> {
    let parent_timeline = refs_store(repo)?
        .get(TimelineKind::Local, parent)?
        .ok_or_else(|| StrataError::timeline_not_found(parent))?;
    let diverged_from = parent_timeline.commit_hash;
    let timeline = create_timeline(repo, name, TimelineKind::Local, diverged_from, description)?;
    Ok(Butterfly {
        timeline,
        diverged_from,
    })
}

pub fn update_timeline(repo: &LocalRepository, timeline: &Timeline) -> Result<(), StrataError> {
    refs_store(repo)?.update(timeline)
}

pub fn delete_timeline(repo: &LocalRepository, kind: TimelineKind, name: &str) -> Result<(), StrataError> {
    refs_store(repo)?.delete(kind, name)
}

pub fn get_timeline(
    repo: &LocalRepository,
    kind: TimelineKind,
    name: &str,
) -> Result<Option<Timeline>, StrataError> {
    refs_store(repo)?.get(kind, name)
}

pub fn list_timelines(repo: &LocalRepository, kind: TimelineKind) -> Result<Vec<Timeline>, StrataError> {
    refs_store(repo)?.list(kind)
}

pub fn set_head(repo: &LocalRepository, name: &str) -> Result<(), StrataError> {
    refs_store(repo)?.set_head(name)
}

pub fn get_current_timeline(repo: &LocalRepository) -> Result<Option<Timeline>, StrataError> {
    refs_store(repo)?.get_current_timeline()
}

/// Switches the working tree to `target`, auto-shelving the outgoing
/// timeline's divergence first.
pub fn switch(repo: &LocalRepository, target: &str) -> Result<SwitchOutcome, StrataError> {
    let store = cas(repo);
    let refs = refs_store(repo)?;
    let shelves = shelf_manager(repo)?;
    switch_engine(
        &store,
        &refs,
        &shelves,
        &repo.path,
        target,
        &no_skip,
        repo.config.chunk_size(),
    )
}

fn merge_resolution_path(repo: &LocalRepository) -> std::path::PathBuf {
    repo.hidden_dir().join(constants::MERGE_RESOLUTION_FILE)
}

/// Runs a three-way merge between `source` and `target`'s committed
/// workspace states against their common-ancestor commit, and applies it
/// to `target`'s working tree. If conflicts remain under the `Auto`
/// strategy, persists a `MERGE_RESOLUTION` document and returns them
/// without updating the target timeline.
pub fn merge(
    repo: &LocalRepository,
    source: &str,
    target: &str,
    strategy: MergeStrategy,
) -> Result<MergeOutcome, StrataError> {
    let store = cas(repo);
    let refs = refs_store(repo)?;

    if merge_resolution_path(repo).exists() {
        return Err(StrataError::busy("a merge is already in progress"));
    }

    let source_timeline = refs
        .get(TimelineKind::Local, source)?
        .ok_or_else(|| StrataError::timeline_not_found(source))?;
    let target_timeline = refs
        .get(TimelineKind::Local, target)?
        .ok_or_else(|| StrataError::timeline_not_found(target))?;

    let source_commit = commit::read_commit(&store, &source_timeline.commit_hash)?;
    let target_commit = commit::read_commit(&store, &target_timeline.commit_hash)?;

    let base_commit_hash = common_ancestor(&store, &source_commit, &target_commit)?
        .unwrap_or(source_timeline.commit_hash);
    let base_commit = commit::read_commit(&store, &base_commit_hash)?;

    let base_index = workspace_index::flatten_tree(&store, &base_commit.tree)?;
    let ours_index = workspace_index::flatten_tree(&store, &target_commit.tree)?;
    let theirs_index = workspace_index::flatten_tree(&store, &source_commit.tree)?;

    let outcome = merge::merge(&store, &base_index, &ours_index, &theirs_index, strategy)?;

    if outcome.conflicts.is_empty() {
        workspace_index::materialize(&store, &outcome.index_root, &repo.path)?;
    } else if strategy == MergeStrategy::Auto {
        let files = outcome
            .conflicts
            .iter()
            .map(|c| FileResolutionStatus {
                path: c.path.clone(),
                strategy,
                resolved: false,
                chunk_choices: Default::default(),
                result_hash: None,
                updated_at: time::OffsetDateTime::now_utc(),
            })
            .collect();
        let resolution = MergeResolution {
            source_timeline: source.to_string(),
            target_timeline: target.to_string(),
            source_commit: source_commit.hash(),
            target_commit: target_commit.hash(),
            base_commit: base_commit.hash(),
            strategy,
            files,
            started_at: time::OffsetDateTime::now_utc(),
        };
        util::fs::write_to_path(
            merge_resolution_path(repo),
            serde_json::to_string_pretty(&resolution)?,
        )?;
    }

    Ok(outcome)
}

/// Finds the nearest common ancestor by intersecting each commit's
/// first-parent MMR chain. `None` means the two commits share no
/// history, in which case the caller falls back to treating `source`
/// itself as the base.
fn common_ancestor(
    cas_store: &dyn ContentStore,
    a: &Commit,
    b: &Commit,
) -> Result<Option<Hash>, StrataError> {
    let mut a_ancestors = std::collections::HashSet::new();
    let mut cursor = Some(a.clone());
    while let Some(c) = cursor {
        a_ancestors.insert(c.hash());
        cursor = match c.parents.first() {
            Some(p) => Some(commit::read_commit(cas_store, p)?),
            None => None,
        };
    }

    let mut cursor = Some(b.clone());
    while let Some(c) = cursor {
        if a_ancestors.contains(&c.hash()) {
            return Ok(Some(c.hash()));
        }
        cursor = match c.parents.first() {
            Some(p) => Some(commit::read_commit(cas_store, p)?),
            None => None,
        };
    }
    Ok(None)
}

/// Re-resolves a persisted merge's remaining conflicts under `strategy`
/// (applied only to the paths still unresolved; already-clean paths keep
/// their prior resolution) and, once every file resolves, archives the
/// resolution to `merge-history/` and clears it. While conflicts remain,
/// rewrites `MERGE_RESOLUTION` with each re-resolved path's updated status.
pub fn merge_continue(
    repo: &LocalRepository,
    strategy: MergeStrategy,
) -> Result<MergeOutcome, StrataError> {
    let resolution_path = merge_resolution_path(repo);
    if !resolution_path.exists() {
        return Err(StrataError::not_found("no merge in progress"));
    }
    let text = util::fs::read_from_path(&resolution_path)?;
    let mut resolution: MergeResolution = serde_json::from_str(&text)?;

    let now = time::OffsetDateTime::now_utc();
    for file in resolution.files.iter_mut() {
        if file.chunk_choices.is_empty() && !file.resolved {
            file.strategy = strategy;
            file.updated_at = now;
        }
    }

    finalize_merge(repo, &resolution_path, resolution)
}

/// Resolves the remaining chunk-level conflicts of a single file using
/// caller-supplied per-chunk picks rather than a whole-file strategy, and
/// persists the choices into that file's `FileResolutionStatus.chunk_choices`.
/// Like `merge_continue`, finalizes the merge once every file resolves.
pub fn merge_continue_chunks(
    repo: &LocalRepository,
    path: &str,
    choices: BTreeMap<usize, ChunkChoice>,
) -> Result<MergeOutcome, StrataError> {
    let resolution_path = merge_resolution_path(repo);
    if !resolution_path.exists() {
        return Err(StrataError::not_found("no merge in progress"));
    }
    let text = util::fs::read_from_path(&resolution_path)?;
    let mut resolution: MergeResolution = serde_json::from_str(&text)?;

    let store = cas(repo);
    let source_commit = commit::read_commit(&store, &resolution.source_commit)?;
    let target_commit = commit::read_commit(&store, &resolution.target_commit)?;
    let base_commit = commit::read_commit(&store, &resolution.base_commit)?;
    let base_index = workspace_index::flatten_tree(&store, &base_commit.tree)?;
    let ours_index = workspace_index::flatten_tree(&store, &target_commit.tree)?;
    let theirs_index = workspace_index::flatten_tree(&store, &source_commit.tree)?;

    let chunks_of = |index: &std::collections::BTreeMap<String, crate::model::workspace_entry::WorkspaceEntry>| -> Result<Vec<Hash>, StrataError> {
        match index.get(path) {
            Some(entry) => chunk::leaf_hashes(&store, &entry.file_ref),
            None => Ok(Vec::new()),
        }
    };
    let base_chunks = chunks_of(&base_index)?;
    let ours_chunks = chunks_of(&ours_index)?;
    let theirs_chunks = chunks_of(&theirs_index)?;

    let result_hash =
        merge::apply_chunk_choices(&store, &base_chunks, &ours_chunks, &theirs_chunks, &choices)?;

    let file = resolution
        .files
        .iter_mut()
        .find(|f| f.path == path)
        .ok_or_else(|| StrataError::not_found(format!("no conflict recorded for path {path}")))?;
    file.chunk_choices = choices;
    file.resolved = true;
    file.result_hash = Some(result_hash);
    file.updated_at = time::OffsetDateTime::now_utc();

    finalize_merge(repo, &resolution_path, resolution)
}

/// Recomputes a merge outcome from the resolution's current state: paths
/// resolved via a whole-file strategy override are re-run through the
/// matrix, and paths resolved via `merge_continue_chunks` have their
/// stored `result_hash` spliced into the merged index directly, since a
/// per-chunk choice has no single `MergeStrategy` to re-apply. Once no
/// conflicts remain, materializes the tree and archives the resolution.
fn finalize_merge(
    repo: &LocalRepository,
    resolution_path: &Path,
    mut resolution: MergeResolution,
) -> Result<MergeOutcome, StrataError> {
    let store = cas(repo);
    let source_commit = commit::read_commit(&store, &resolution.source_commit)?;
    let target_commit = commit::read_commit(&store, &resolution.target_commit)?;
    let base_commit = commit::read_commit(&store, &resolution.base_commit)?;
    let base_index = workspace_index::flatten_tree(&store, &base_commit.tree)?;
    let ours_index = workspace_index::flatten_tree(&store, &target_commit.tree)?;
    let theirs_index = workspace_index::flatten_tree(&store, &source_commit.tree)?;

    let chunk_resolved: std::collections::BTreeSet<&str> = resolution
        .files
        .iter()
        .filter(|f| f.resolved && !f.chunk_choices.is_empty())
        .map(|f| f.path.as_str())
        .collect();

    let overrides: BTreeMap<String, MergeStrategy> = resolution
        .files
        .iter()
        .filter(|f| f.chunk_choices.is_empty())
        .map(|f| (f.path.clone(), f.strategy))
        .collect();

    let mut outcome = merge::merge_with_overrides(
        &store,
        &base_index,
        &ours_index,
        &theirs_index,
        MergeStrategy::Auto,
        &overrides,
    )?;

    if !chunk_resolved.is_empty() {
        outcome
            .conflicts
            .retain(|c| !chunk_resolved.contains(c.path.as_str()));

        let mut entries: Vec<DirEntry> = hamt::list(&store, &outcome.index_root)?
            .into_iter()
            .filter(|e| !chunk_resolved.contains(e.name.as_str()))
            .collect();
        for file in resolution
            .files
            .iter()
            .filter(|f| chunk_resolved.contains(f.path.as_str()))
        {
            let hash = file
                .result_hash
                .expect("a chunk-resolved file always has a stored result hash");
            let size = chunk::read_all(&store, &hash)?.len() as u64;
            entries.push(DirEntry {
                name: file.path.clone(),
                entry: EntryRef::File { hash, size },
            });
        }
        outcome.index_root = hamt::build(&store, entries)?;
    }

    let still_conflicted: std::collections::BTreeSet<&str> =
        outcome.conflicts.iter().map(|c| c.path.as_str()).collect();
    let now = time::OffsetDateTime::now_utc();
    for file in resolution.files.iter_mut() {
        if file.chunk_choices.is_empty() {
            file.resolved = !still_conflicted.contains(file.path.as_str());
            file.updated_at = now;
        }
    }

    if outcome.conflicts.is_empty() {
        workspace_index::materialize(&store, &outcome.index_root, &repo.path)?;
        archive_resolution(repo, &resolution)?;
        util::fs::remove_file(resolution_path)?;
    } else {
        util::fs::write_to_path(resolution_path, serde_json::to_string_pretty(&resolution)?)?;
    }

    Ok(outcome)
}

fn archive_resolution(repo: &LocalRepository, resolution: &MergeResolution) -> Result<(), StrataError> {
    let history_dir = repo.hidden_dir().join(constants::MERGE_HISTORY_DIR);
    let filename = format!(
        "{}_{}-to-{}.json",
        resolution.started_at.unix_timestamp(),
        resolution.source_timeline,
        resolution.target_timeline
    );
    util::fs::write_to_path(
        history_dir.join(filename),
        serde_json::to_string_pretty(resolution)?,
    )
}

/// Discards an in-progress merge's persisted state without touching the
/// working tree.
pub fn merge_abort(repo: &LocalRepository) -> Result<(), StrataError> {
    let path = merge_resolution_path(repo);
    if !path.exists() {
        return Err(StrataError::not_found("no merge in progress"));
    }
    util::fs::remove_file(path)
}

pub fn create_shelf(repo: &LocalRepository, name: &str, timeline: &str) -> Result<ShelfRecord, StrataError> {
    let index_root = scan_workspace(repo, None)?;
    shelf_manager(repo)?.create_manual(name, timeline, index_root)
}

pub fn apply_shelf(repo: &LocalRepository, name: &str) -> Result<(), StrataError> {
    let shelves = shelf_manager(repo)?;
    let record = shelves
        .get(name)?
        .ok_or_else(|| StrataError::shelf_not_found(name))?;
    workspace_index::materialize(&cas(repo), &record.index_root, &repo.path)?;
    shelves.drop_shelf(name)
}

pub fn list_shelves(repo: &LocalRepository) -> Result<Vec<ShelfRecord>, StrataError> {
    shelf_manager(repo)?.list()
}

pub fn drop_shelf(repo: &LocalRepository, name: &str) -> Result<(), StrataError> {
    shelf_manager(repo)?.drop_shelf(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            name: "a".to_string(),
            email: "a@x".to_string(),
        }
    }

    #[test]
    fn test_init_then_create_commit_then_timeline() {
        crate::test::run_empty_repo_test(|repo| {
            std::fs::write(repo.path.join("README.md"), "# hi").unwrap();

            let commit = create_commit(
                &repo,
                constants::DEFAULT_TIMELINE_NAME,
                vec![],
                identity(),
                identity(),
                "Initial commit".to_string(),
            )?;

            let timeline = create_timeline(
                &repo,
                constants::DEFAULT_TIMELINE_NAME,
                TimelineKind::Local,
                commit.hash(),
                String::new(),
            )?;
            set_head(&repo, &timeline.name)?;

            let current = get_current_timeline(&repo)?.unwrap();
            assert_eq!(current.commit_hash, commit.hash());

            let files = list_files(&repo, &commit)?;
            assert_eq!(files, vec!["README.md".to_string()]);

            let content = get_file_content(&repo, &commit, "README.md")?;
            assert_eq!(content, b"# hi");

            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_shelf_round_trip() {
        crate::test::run_empty_repo_test(|repo| {
            std::fs::write(repo.path.join("a.txt"), "original").unwrap();
            create_shelf(&repo, "wip", constants::DEFAULT_TIMELINE_NAME)?;

            std::fs::write(repo.path.join("a.txt"), "changed").unwrap();
            apply_shelf(&repo, "wip")?;

            let content = std::fs::read_to_string(repo.path.join("a.txt")).unwrap();
            assert_eq!(content, "original");
            assert!(list_shelves(&repo)?.is_empty());

            Ok(())
        })
        .unwrap();
    }
}
