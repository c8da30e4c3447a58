//! The on-disk handle for a repository: its working directory root and
//! its parsed config. Nearly every operation in `core` and `repositories`
//! takes a `&LocalRepository` as an explicit dependency rather than
//! reaching for global state.
//!

use std::path::{Path, PathBuf};

use crate::config::RepositoryConfig;
use crate::error::StrataError;
use crate::util;

#[derive(Debug, Clone)]
pub struct LocalRepository {
    /// Working directory root (the directory containing `.strata`).
    pub path: PathBuf,
    pub config: RepositoryConfig,
}

impl LocalRepository {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StrataError> {
        let path = path.as_ref().to_path_buf();
        let config_path = util::fs::config_filepath(&path);
        let config = if config_path.exists() {
            RepositoryConfig::from_file(&config_path)?
        } else {
            RepositoryConfig::new()
        };
        Ok(Self { path, config })
    }

    pub fn from_current_dir() -> Result<Self, StrataError> {
        Self::new(std::env::current_dir()?)
    }

    pub fn hidden_dir(&self) -> PathBuf {
        util::fs::strata_hidden_dir(&self.path)
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.hidden_dir().join(crate::constants::OBJECTS_DIR)
    }

    pub fn save_config(&self) -> Result<(), StrataError> {
        let config_path = util::fs::config_filepath(&self.path);
        self.config.save(&config_path)
    }
}

impl PartialEq for LocalRepository {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}
