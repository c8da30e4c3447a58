//! The ref store: a transactional key-value store holding three
//! namespaces (local timelines, remote timelines, tags) plus a HEAD
//! singleton naming the current local timeline. Every mutation is a
//! single-key write, so concurrent switchers are serialized by the
//! store's own transaction discipline.
//!

use std::sync::Arc;

use crate::db::KvDb;
use crate::error::StrataError;
use crate::model::{Timeline, TimelineKind};

const HEAD_KEY: &str = "HEAD";

fn namespace_prefix(kind: TimelineKind) -> &'static str {
    match kind {
        TimelineKind::Local => "heads/",
        TimelineKind::Remote => "remotes/",
        TimelineKind::Tag => "tags/",
    }
}

fn key_for(kind: TimelineKind, name: &str) -> String {
    format!("{}{name}", namespace_prefix(kind))
}

pub struct RefStore {
    db: Arc<KvDb>,
}

impl RefStore {
    pub fn new(db: Arc<KvDb>) -> Self {
        Self { db }
    }

    pub fn create(&self, timeline: &Timeline) -> Result<(), StrataError> {
        if crate::model::timeline::is_invalid_timeline_name(&timeline.name) {
            return Err(StrataError::invalid_encoding(format!(
                "invalid timeline name: {}",
                timeline.name
            )));
        }
        let key = key_for(timeline.kind, &timeline.name);
        if crate::db::kv_db::has_key(&self.db, &key) {
            return Err(StrataError::already_exists(format!(
                "timeline {}",
                timeline.name
            )));
        }
        self.db.put(&key, serde_json::to_vec(timeline)?)?;
        Ok(())
    }

    pub fn update(&self, timeline: &Timeline) -> Result<(), StrataError> {
        let key = key_for(timeline.kind, &timeline.name);
        if !crate::db::kv_db::has_key(&self.db, &key) {
            return Err(StrataError::timeline_not_found(&timeline.name));
        }
        self.db.put(&key, serde_json::to_vec(timeline)?)?;
        Ok(())
    }

    pub fn get(&self, kind: TimelineKind, name: &str) -> Result<Option<Timeline>, StrataError> {
        let key = key_for(kind, name);
        match self.db.get(&key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, kind: TimelineKind, name: &str) -> Result<(), StrataError> {
        let key = key_for(kind, name);
        if !crate::db::kv_db::has_key(&self.db, &key) {
            return Err(StrataError::timeline_not_found(name));
        }
        crate::db::kv_db::delete(&self.db, &key)
    }

    pub fn list(&self, kind: TimelineKind) -> Result<Vec<Timeline>, StrataError> {
        let prefix = namespace_prefix(kind);
        let mut out = Vec::new();
        for key in crate::db::kv_db::list_keys(&self.db)? {
            if let Some(bytes) = self.db.get(&key)? {
                if key.starts_with(prefix) {
                    out.push(serde_json::from_slice(&bytes)?);
                }
            }
        }
        out.sort_by(|a: &Timeline, b: &Timeline| a.name.cmp(&b.name));
        Ok(out)
    }

    pub fn set_head(&self, timeline_name: &str) -> Result<(), StrataError> {
        self.db.put(HEAD_KEY, timeline_name.as_bytes())?;
        Ok(())
    }

    pub fn get_head(&self) -> Result<Option<String>, StrataError> {
        match self.db.get(HEAD_KEY)? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes).map_err(|e| {
                StrataError::invalid_encoding(format!("HEAD is not valid utf8: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    pub fn get_current_timeline(&self) -> Result<Option<Timeline>, StrataError> {
        match self.get_head()? {
            Some(name) => self.get(TimelineKind::Local, &name),
            None => Ok(None),
        }
    }
}
