//! Thin wrappers around `rocksdb` shared by the ref store, MMR, shelf
//! manager, and git-interop mapping table.
//!

pub mod kv_db;
pub mod opts;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rocksdb::{DBWithThreadMode, MultiThreaded};

use crate::error::StrataError;

pub type KvDb = DBWithThreadMode<MultiThreaded>;

static DB_CACHE: LazyLock<RwLock<HashMap<PathBuf, Arc<KvDb>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Returns a cached handle for the rocksdb database rooted at `path`,
/// opening it the first time it's requested. `rocksdb` holds an exclusive
/// file lock per path, so every caller in this process must share one
/// handle rather than reopening it.
pub fn open(path: impl AsRef<Path>) -> Result<Arc<KvDb>, StrataError> {
    let path = path.as_ref().to_path_buf();

    if let Some(db) = DB_CACHE.read().get(&path) {
        return Ok(Arc::clone(db));
    }

    let mut cache = DB_CACHE.write();
    if let Some(db) = cache.get(&path) {
        return Ok(Arc::clone(db));
    }

    log::debug!("db::open opening rocksdb at {path:?}");
    let db = KvDb::open(&opts::default(), &path)?;
    let db = Arc::new(db);
    cache.insert(path, Arc::clone(&db));
    Ok(db)
}
