// Catch all integration tests for the library: end-to-end flows through
// the public `repositories` surface rather than the `core` internals
// exercised by each module's own unit tests.

use std::collections::BTreeMap;

use libstrata::error::StrataError;
use libstrata::model::{ChunkChoice, Identity, MergeStrategy, TimelineKind};
use libstrata::repositories;
use libstrata::test;

fn identity(name: &str) -> Identity {
    Identity {
        name: name.to_string(),
        email: format!("{name}@example.com"),
    }
}

fn write_file(repo: &libstrata::model::LocalRepository, rel: &str, content: &str) {
    let path = repo.path.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_init_creates_default_timeline_head() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        assert_eq!(
            repositories::get_timeline(&repo, TimelineKind::Local, "main")?,
            None
        );
        // HEAD names "main" even though no commit exists for it yet.
        let store = repo.hidden_dir();
        assert!(store.exists());
        Ok(())
    })
}

#[test]
fn test_commit_then_create_timeline_then_switch_shelves_divergence() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "a.txt", "1");
        let commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "seed".to_string(),
        )?;
        let main = repositories::create_timeline(
            &repo,
            "main",
            TimelineKind::Local,
            commit.hash(),
            String::new(),
        )?;
        repositories::set_head(&repo, &main.name)?;

        // Create "feat" from the same commit (a butterfly off main).
        repositories::create_timeline(
            &repo,
            "feat",
            TimelineKind::Local,
            commit.hash(),
            "branched from main".to_string(),
        )?;

        // Diverge on "main": edit a.txt, add an untracked file.
        write_file(&repo, "a.txt", "2");
        write_file(&repo, "b.txt", "new");

        repositories::switch(&repo, "feat")?;
        assert_eq!(std::fs::read_to_string(repo.path.join("a.txt")).unwrap(), "1");
        assert!(!repo.path.join("b.txt").exists());

        repositories::switch(&repo, "main")?;
        assert_eq!(std::fs::read_to_string(repo.path.join("a.txt")).unwrap(), "2");
        assert_eq!(std::fs::read_to_string(repo.path.join("b.txt")).unwrap(), "new");

        Ok(())
    })
}

#[test]
fn test_merge_clean_three_way() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "f.txt", "base content here");
        let base_commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "base".to_string(),
        )?;
        repositories::create_timeline(
            &repo,
            "main",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;
        repositories::set_head(&repo, "main")?;
        repositories::create_timeline(
            &repo,
            "feat",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;

        // "main" only appends; "feat" only edits the tail end untouched by main.
        write_file(&repo, "other.txt", "untouched by feat");
        let main_commit = repositories::create_commit(
            &repo,
            "main",
            vec![base_commit.hash()],
            identity("a"),
            identity("a"),
            "main edit".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "main")?.unwrap();
            t.commit_hash = main_commit.hash();
            t
        })?;

        repositories::switch(&repo, "feat")?;
        write_file(&repo, "f.txt", "base content HERE");
        let feat_commit = repositories::create_commit(
            &repo,
            "feat",
            vec![base_commit.hash()],
            identity("b"),
            identity("b"),
            "feat edit".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "feat")?.unwrap();
            t.commit_hash = feat_commit.hash();
            t
        })?;

        let outcome = repositories::merge(&repo, "feat", "main", MergeStrategy::Auto)?;
        assert!(outcome.conflicts.is_empty());

        Ok(())
    })
}

#[test]
fn test_merge_conflict_persists_resolution_then_continues() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "f.txt", "base");
        let base_commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "base".to_string(),
        )?;
        repositories::create_timeline(
            &repo,
            "main",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;
        repositories::set_head(&repo, "main")?;
        repositories::create_timeline(
            &repo,
            "feat",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;

        write_file(&repo, "f.txt", "ours-edit");
        let main_commit = repositories::create_commit(
            &repo,
            "main",
            vec![base_commit.hash()],
            identity("a"),
            identity("a"),
            "ours".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "main")?.unwrap();
            t.commit_hash = main_commit.hash();
            t
        })?;

        repositories::switch(&repo, "feat")?;
        write_file(&repo, "f.txt", "theirs-edit");
        let feat_commit = repositories::create_commit(
            &repo,
            "feat",
            vec![base_commit.hash()],
            identity("b"),
            identity("b"),
            "theirs".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "feat")?.unwrap();
            t.commit_hash = feat_commit.hash();
            t
        })?;

        let outcome = repositories::merge(&repo, "feat", "main", MergeStrategy::Auto)?;
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(repo.hidden_dir().join("MERGE_RESOLUTION").exists());

        // A conflicting second merge attempt is rejected while one is in progress.
        assert!(matches!(
            repositories::merge(&repo, "feat", "main", MergeStrategy::Auto),
            Err(StrataError::Busy(_))
        ));

        // Resolving the remaining conflict with `theirs` via `continue`
        // finishes the merge, materializes the result, and archives the
        // resolution instead of leaving it in progress.
        let outcome = repositories::merge_continue(&repo, MergeStrategy::Theirs)?;
        assert!(outcome.conflicts.is_empty());
        assert!(!repo.hidden_dir().join("MERGE_RESOLUTION").exists());
        assert_eq!(
            std::fs::read_to_string(repo.path.join("f.txt")).unwrap(),
            "theirs-edit"
        );
        let history_dir = repo.hidden_dir().join("merge-history");
        assert_eq!(std::fs::read_dir(&history_dir).unwrap().count(), 1);

        Ok(())
    })
}

#[test]
fn test_merge_conflict_can_be_aborted() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "f.txt", "base");
        let base_commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "base".to_string(),
        )?;
        repositories::create_timeline(
            &repo,
            "main",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;
        repositories::set_head(&repo, "main")?;
        repositories::create_timeline(
            &repo,
            "feat",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;

        write_file(&repo, "f.txt", "ours-edit");
        let main_commit = repositories::create_commit(
            &repo,
            "main",
            vec![base_commit.hash()],
            identity("a"),
            identity("a"),
            "ours".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "main")?.unwrap();
            t.commit_hash = main_commit.hash();
            t
        })?;

        repositories::switch(&repo, "feat")?;
        write_file(&repo, "f.txt", "theirs-edit");
        let feat_commit = repositories::create_commit(
            &repo,
            "feat",
            vec![base_commit.hash()],
            identity("b"),
            identity("b"),
            "theirs".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "feat")?.unwrap();
            t.commit_hash = feat_commit.hash();
            t
        })?;

        repositories::merge(&repo, "feat", "main", MergeStrategy::Auto)?;
        repositories::merge_abort(&repo)?;
        assert!(!repo.hidden_dir().join("MERGE_RESOLUTION").exists());
        assert!(matches!(
            repositories::merge_continue(&repo, MergeStrategy::Theirs),
            Err(StrataError::NotFound(_))
        ));

        Ok(())
    })
}

#[test]
fn test_manual_shelf_round_trip_through_repositories() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "a.txt", "original");
        repositories::create_shelf(&repo, "wip", "main")?;

        write_file(&repo, "a.txt", "changed");
        repositories::apply_shelf(&repo, "wip")?;

        assert_eq!(
            std::fs::read_to_string(repo.path.join("a.txt")).unwrap(),
            "original"
        );
        assert!(repositories::list_shelves(&repo)?.is_empty());
        Ok(())
    })
}

#[test]
fn test_git_sha1_projection_round_trips() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "a.txt", "content");
        let commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "seed".to_string(),
        )?;
        assert_eq!(repositories::lookup_git_sha1(&repo, &commit.hash())?, None);
        Ok(())
    })
}

#[test]
fn test_create_timeline_rejects_invalid_name() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "a.txt", "1");
        let commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "seed".to_string(),
        )?;
        assert!(repositories::create_timeline(
            &repo,
            "bad name",
            TimelineKind::Local,
            commit.hash(),
            String::new(),
        )
        .is_err());
        assert_eq!(
            repositories::get_timeline(&repo, TimelineKind::Local, "bad name")?,
            None
        );
        Ok(())
    })
}

#[test]
fn test_create_butterfly_tracks_divergence_point() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        write_file(&repo, "a.txt", "1");
        let commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "seed".to_string(),
        )?;
        let main = repositories::create_timeline(
            &repo,
            "main",
            TimelineKind::Local,
            commit.hash(),
            String::new(),
        )?;
        repositories::set_head(&repo, &main.name)?;

        let butterfly =
            repositories::create_butterfly(&repo, "feat", "main", "branched from main".to_string())?;
        assert_eq!(butterfly.diverged_from, commit.hash());
        assert_eq!(butterfly.timeline.name, "feat");
        assert_eq!(
            repositories::get_timeline(&repo, TimelineKind::Local, "feat")?
                .unwrap()
                .commit_hash,
            commit.hash()
        );
        Ok(())
    })
}

#[test]
fn test_merge_conflict_resolved_via_chunk_choices() -> Result<(), StrataError> {
    test::run_empty_repo_test(|repo| {
        let mut repo = repo;
        repo.config.chunk_size = Some(4);

        write_file(&repo, "f.txt", "AAAABBBB");
        let base_commit = repositories::create_commit(
            &repo,
            "main",
            vec![],
            identity("a"),
            identity("a"),
            "base".to_string(),
        )?;
        repositories::create_timeline(
            &repo,
            "main",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;
        repositories::set_head(&repo, "main")?;
        repositories::create_timeline(
            &repo,
            "feat",
            TimelineKind::Local,
            base_commit.hash(),
            String::new(),
        )?;

        // Leaf 0 (base "AAAA") diverges on both sides; leaf 1 ("BBBB") is
        // untouched, so only the first chunk conflicts.
        write_file(&repo, "f.txt", "aaaaBBBB");
        let main_commit = repositories::create_commit(
            &repo,
            "main",
            vec![base_commit.hash()],
            identity("a"),
            identity("a"),
            "ours".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "main")?.unwrap();
            t.commit_hash = main_commit.hash();
            t
        })?;

        repositories::switch(&repo, "feat")?;
        write_file(&repo, "f.txt", "XXXXBBBB");
        let feat_commit = repositories::create_commit(
            &repo,
            "feat",
            vec![base_commit.hash()],
            identity("b"),
            identity("b"),
            "theirs".to_string(),
        )?;
        repositories::update_timeline(&repo, &{
            let mut t = repositories::get_timeline(&repo, TimelineKind::Local, "feat")?.unwrap();
            t.commit_hash = feat_commit.hash();
            t
        })?;

        let outcome = repositories::merge(&repo, "feat", "main", MergeStrategy::Auto)?;
        assert_eq!(outcome.conflicts.len(), 1);
        assert!(repo.hidden_dir().join("MERGE_RESOLUTION").exists());

        let mut choices = BTreeMap::new();
        choices.insert(0usize, ChunkChoice::Theirs);
        let outcome = repositories::merge_continue_chunks(&repo, "f.txt", choices)?;
        assert!(outcome.conflicts.is_empty());
        assert!(!repo.hidden_dir().join("MERGE_RESOLUTION").exists());
        assert_eq!(
            std::fs::read_to_string(repo.path.join("f.txt")).unwrap(),
            "XXXXBBBB"
        );

        Ok(())
    })
}
