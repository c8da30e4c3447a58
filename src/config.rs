//! Per-repository configuration persisted under `.strata/config.toml`.
//!

pub mod repository_config;

pub use crate::config::repository_config::RepositoryConfig;
