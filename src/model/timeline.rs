//! A timeline is a named, mutable pointer to a commit. Local timelines,
//! remote timelines, and tags all share this shape; `kind` distinguishes
//! them within the ref store's namespaces.
//!

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineKind {
    Local,
    Remote,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub name: String,
    pub kind: TimelineKind,
    pub commit_hash: Hash,
    /// SHA-256 projection of `commit_hash`'s canonical bytes, for callers
    /// that want a second, widely-recognized digest.
    pub sha256: Option<[u8; 32]>,
    /// Git-SHA-1 projection of the equivalent Git object, populated by the
    /// boundary layer when this commit has crossed into a Git remote.
    pub git_sha1: Option<[u8; 20]>,
    pub description: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

impl Timeline {
    pub fn new(name: impl Into<String>, kind: TimelineKind, commit_hash: Hash) -> Self {
        Self {
            name: name.into(),
            kind,
            commit_hash,
            sha256: None,
            git_sha1: None,
            description: String::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A timeline created as an experimental branch of a parent timeline,
/// tracking the commit it diverged from. `butterfly` timelines are plain
/// local timelines in the ref store; this struct captures the extra
/// provenance a caller may want to record at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Butterfly {
    pub timeline: Timeline,
    pub diverged_from: Hash,
}

fn is_invalid_timeline_char(c: char) -> bool {
    matches!(c, ' ' | '~' | '^' | ':' | '?' | '[' | '*' | '\\')
}

/// Mirrors `git-check-ref-format`'s core restrictions closely enough to
/// keep timeline names usable as ref-store keys and filesystem-safe
/// components under `refs/heads/<name>`.
pub fn is_invalid_timeline_name(name: &str) -> bool {
    if name.is_empty() || name == "@" || name.ends_with('.') || name.contains("..") {
        return true;
    }
    name.contains(is_invalid_timeline_char) || name.contains("@{")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_timeline_names_rejected() {
        assert!(is_invalid_timeline_name(""));
        assert!(is_invalid_timeline_name("@"));
        assert!(is_invalid_timeline_name("feat."));
        assert!(is_invalid_timeline_name("a..b"));
        assert!(is_invalid_timeline_name("a b"));
        assert!(is_invalid_timeline_name("a~b"));
        assert!(is_invalid_timeline_name("a@{b"));
    }

    #[test]
    fn test_ordinary_timeline_names_accepted() {
        assert!(!is_invalid_timeline_name("main"));
        assert!(!is_invalid_timeline_name("feature/login"));
        assert!(!is_invalid_timeline_name("v1.2"));
    }
}
