//! Helpers for our unit and integration tests
//!

use crate::error::StrataError;
use crate::model::LocalRepository;
use crate::repositories;

use std::path::PathBuf;

const TEST_RUN_DIR: &str = "data/test/runs";

fn create_repo_dir(base_dir: &str) -> Result<PathBuf, StrataError> {
    let repo_name = format!("{}/repo_{}", base_dir, uuid::Uuid::new_v4());
    std::fs::create_dir_all(&repo_name)?;
    Ok(PathBuf::from(&repo_name))
}

/// Runs a unit test against a freshly `init`ed repo in a uniquely named
/// scratch directory, cleaning the directory up whether or not the test
/// panics.
///
/// ```
/// # use libstrata::test;
/// test::run_empty_repo_test(|repo| {
///     assert!(repo.path.exists());
///     Ok(())
/// }).unwrap();
/// ```
pub fn run_empty_repo_test<T>(test: T) -> Result<(), StrataError>
where
    T: FnOnce(LocalRepository) -> Result<(), StrataError> + std::panic::UnwindSafe,
{
    let repo_dir = create_repo_dir(TEST_RUN_DIR)?;
    let repo = repositories::init(&repo_dir)?;

    let result = std::panic::catch_unwind(|| test(repo));

    std::fs::remove_dir_all(&repo_dir)?;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
