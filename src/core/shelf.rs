//! The shelf manager: preserves a workspace snapshot across a timeline
//! switch. Auto-shelves are keyed by owning timeline and replaced on
//! every switch-away; manual shelves are named by the caller and persist
//! until explicitly dropped.
//!

use std::sync::Arc;

use crate::db::KvDb;
use crate::error::StrataError;
use crate::model::hash::Hash;
use crate::model::ShelfRecord;

pub struct ShelfManager {
    db: Arc<KvDb>,
}

impl ShelfManager {
    pub fn new(db: Arc<KvDb>) -> Self {
        Self { db }
    }

    /// Records (replacing any existing) the auto-shelf for `timeline`.
    pub fn shelve_auto(&self, timeline: &str, index_root: Hash) -> Result<ShelfRecord, StrataError> {
        let record = ShelfRecord::new_auto(timeline, index_root);
        self.db.put(&record.id, serde_json::to_vec(&record)?)?;
        Ok(record)
    }

    pub fn create_manual(
        &self,
        name: &str,
        timeline: &str,
        index_root: Hash,
    ) -> Result<ShelfRecord, StrataError> {
        if crate::db::kv_db::has_key(&self.db, name) {
            return Err(StrataError::already_exists(format!("shelf {name}")));
        }
        let record = ShelfRecord::new_manual(name, timeline, index_root);
        self.db.put(&record.id, serde_json::to_vec(&record)?)?;
        Ok(record)
    }

    pub fn get_auto(&self, timeline: &str) -> Result<Option<ShelfRecord>, StrataError> {
        self.get(&ShelfRecord::auto_id_for(timeline))
    }

    pub fn get(&self, id: &str) -> Result<Option<ShelfRecord>, StrataError> {
        match self.db.get(id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<ShelfRecord>, StrataError> {
        let mut out = Vec::new();
        for key in crate::db::kv_db::list_keys(&self.db)? {
            if let Some(bytes) = self.db.get(&key)? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        out.sort_by(|a: &ShelfRecord, b: &ShelfRecord| a.id.cmp(&b.id));
        Ok(out)
    }

    pub fn drop_shelf(&self, id: &str) -> Result<(), StrataError> {
        if !crate::db::kv_db::has_key(&self.db, id) {
            return Err(StrataError::shelf_not_found(id));
        }
        crate::db::kv_db::delete(&self.db, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, ShelfManager) {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::open(dir.path().join("shelf.db")).unwrap();
        (dir, ShelfManager::new(db))
    }

    #[test]
    fn test_auto_shelf_replaced_on_reshelve() {
        let (_dir, shelves) = manager();
        shelves.shelve_auto("feat", Hash::of(b"first")).unwrap();
        shelves.shelve_auto("feat", Hash::of(b"second")).unwrap();

        let records = shelves.list().unwrap();
        let auto_records: Vec<_> = records.iter().filter(|r| r.owning_timeline == "feat").collect();
        assert_eq!(auto_records.len(), 1);
        assert_eq!(auto_records[0].index_root, Hash::of(b"second"));
    }

    #[test]
    fn test_manual_shelf_duplicate_name_fails() {
        let (_dir, shelves) = manager();
        shelves
            .create_manual("wip", "main", Hash::of(b"snapshot"))
            .unwrap();
        assert!(shelves
            .create_manual("wip", "main", Hash::of(b"other"))
            .is_err());
    }

    #[test]
    fn test_drop_missing_shelf_fails() {
        let (_dir, shelves) = manager();
        assert!(shelves.drop_shelf("nope").is_err());
    }
}
