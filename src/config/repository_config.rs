//! The repository's own settings: the default author/committer identity
//! used when a commit doesn't supply one, and any chunk-size override.
//!

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::StrataError;
use crate::model::Identity;
use crate::util;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RepositoryConfig {
    pub default_identity: Option<Identity>,
    /// Target leaf size for the chunked file codec, in bytes. Falls back
    /// to `DEFAULT_CHUNK_SIZE` when unset.
    pub chunk_size: Option<u64>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        RepositoryConfig {
            default_identity: None,
            chunk_size: None,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StrataError> {
        let contents = util::fs::read_from_path(&path)?;
        let config: RepositoryConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StrataError> {
        let contents = toml::to_string_pretty(self)?;
        util::fs::write_to_path(path, contents)
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }
}
