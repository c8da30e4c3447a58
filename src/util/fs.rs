//! Wrapper around std::fs commands to make them easier to use and to
//! normalize path handling across platforms.
//!

use std::fs::File;
use std::io::prelude::*;
use std::path::{Component, Path, PathBuf};

use jwalk::WalkDir;

use crate::constants;
use crate::error::StrataError;

pub fn strata_hidden_dir(repo_path: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(repo_path.as_ref()).join(constants::STRATA_HIDDEN_DIR)
}

pub fn repo_exists(repo_path: impl AsRef<Path>) -> bool {
    strata_hidden_dir(repo_path).exists()
}

pub fn config_filepath(repo_path: impl AsRef<Path>) -> PathBuf {
    strata_hidden_dir(repo_path).join(constants::REPO_CONFIG_FILENAME)
}

pub fn read_from_path(path: impl AsRef<Path>) -> Result<String, StrataError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn read_bytes_from_path(path: impl AsRef<Path>) -> Result<Vec<u8>, StrataError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn write_to_path(path: impl AsRef<Path>, value: impl AsRef<str>) -> Result<(), StrataError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, value.as_ref().as_bytes())
        .map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn write_data(path: impl AsRef<Path>, data: &[u8]) -> Result<(), StrataError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, data).map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn create_dir_all(path: impl AsRef<Path>) -> Result<(), StrataError> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn remove_dir_all(path: impl AsRef<Path>) -> Result<(), StrataError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(());
    }
    std::fs::remove_dir_all(path).map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn remove_file(path: impl AsRef<Path>) -> Result<(), StrataError> {
    let path = path.as_ref();
    std::fs::remove_file(path).map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

pub fn file_exists_in_directory(directory: impl AsRef<Path>, file: impl AsRef<Path>) -> bool {
    directory.as_ref().join(file).exists()
}

pub fn open_file(path: impl AsRef<Path>) -> Result<File, StrataError> {
    let path = path.as_ref();
    File::open(path).map_err(|e| StrataError::io_error_with_path(e, path.to_path_buf()))
}

/// Windows-safe, forward-slash path string relative to `base`, suitable for
/// storage as a workspace index entry name.
pub fn to_relative_forward_slash(base: &Path, path: &Path) -> Result<String, StrataError> {
    let relative = path
        .strip_prefix(base)
        .map_err(|e| StrataError::strip_prefix_error(e, path.to_path_buf()))?;
    Ok(crate::util::str::to_forward_slash(
        &relative.to_string_lossy(),
    ))
}

/// Collapses `.` and `..` components without touching the filesystem, so it
/// works for paths that don't exist yet (unlike `std::fs::canonicalize`).
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// All regular files under `dir`, recursively, skipping the repository's
/// own hidden metadata directory.
pub fn rlist_files_in_dir(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !is_in_strata_hidden_dir(entry.path().as_path()))
        .map(|entry| entry.path())
        .collect()
}

pub fn is_in_strata_hidden_dir(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == constants::STRATA_HIDDEN_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_collapses_dotdot() {
        let normalized = normalize_path(Path::new("a/b/../c/./d"));
        assert_eq!(normalized, PathBuf::from("a/c/d"));
    }

    #[test]
    fn test_is_in_strata_hidden_dir() {
        assert!(is_in_strata_hidden_dir(Path::new("repo/.strata/objects/ab")));
        assert!(!is_in_strata_hidden_dir(Path::new("repo/src/main.rs")));
    }
}
