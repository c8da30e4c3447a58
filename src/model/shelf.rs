//! A shelf is a preserved workspace snapshot. Auto-shelves are per-timeline
//! and consumed by the switch engine on return; manual shelves are
//! identified by a user-supplied name and persist until dropped.
//!

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfRecord {
    pub id: String,
    pub owning_timeline: String,
    /// Workspace-index root hash of the preserved state.
    pub index_root: Hash,
    /// Optional staged-file snapshot (same representation as `index_root`,
    /// distinct because the core tracks staged vs. working state
    /// separately for manual shelves).
    pub staged_index_root: Option<Hash>,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    pub auto: bool,
}

impl ShelfRecord {
    pub fn auto_id_for(timeline: &str) -> String {
        format!("auto/{timeline}")
    }

    pub fn new_auto(timeline: impl Into<String>, index_root: Hash) -> Self {
        let timeline = timeline.into();
        Self {
            id: Self::auto_id_for(&timeline),
            owning_timeline: timeline,
            index_root,
            staged_index_root: None,
            created_at: OffsetDateTime::now_utc(),
            auto: true,
        }
    }

    pub fn new_manual(
        name: impl Into<String>,
        timeline: impl Into<String>,
        index_root: Hash,
    ) -> Self {
        Self {
            id: name.into(),
            owning_timeline: timeline.into(),
            index_root,
            staged_index_root: None,
            created_at: OffsetDateTime::now_utc(),
            auto: false,
        }
    }
}
