// Filenames and dirs
pub const STRATA_HIDDEN_DIR: &str = ".strata";
pub const REPO_CONFIG_FILENAME: &str = "config.toml";
pub const DEFAULT_TIMELINE_NAME: &str = "main";

pub const OBJECTS_DIR: &str = "objects";
pub const REFS_DIR: &str = "refs";
pub const REFS_HEADS_DIR: &str = "heads";
pub const REFS_TAGS_DIR: &str = "tags";
pub const REFS_REMOTES_DIR: &str = "remotes";
pub const HEAD_FILE: &str = "HEAD";

pub const MMR_DB: &str = "mmr.db";
pub const REFS_DB: &str = "refs.db";
pub const SHELF_DB: &str = "shelf.db";
pub const GIT_MAP_DB: &str = "git_map.db";

pub const MERGE_RESOLUTION_FILE: &str = "MERGE_RESOLUTION";
pub const MERGE_HISTORY_DIR: &str = "merge-history";

pub const IGNORE_PATTERNS_FILE: &str = "ignore-patterns";

pub const NO_REPO_MSG: &str = "fatal: no strata repository exists, looking for directory: .strata";

/// Default target leaf size for the chunked file codec, in bytes (64 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 65_536;

/// Default number of entries a HAMT leaf node may hold before it splits.
pub const HAMT_LEAF_MAX_ENTRIES: usize = 16;

/// Number of bits of the hashed name consumed at each HAMT level.
pub const HAMT_BITS_PER_LEVEL: u32 = 5;

/// Maximum depth of the HAMT trie: 256 bits of BLAKE3(name) / 5 bits per level.
pub const HAMT_MAX_DEPTH: u32 = 52;

/// Default worker-pool lower bound for parallel scan/hash operations.
pub const MIN_SCAN_WORKERS: usize = 8;
/// Default worker-pool upper bound for parallel scan/hash operations.
pub const MAX_SCAN_WORKERS: usize = 32;

pub const STRATA_VERSION: &str = env!("CARGO_PKG_VERSION");
