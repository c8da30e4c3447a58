//! Errors for the strata library
//!
//! Enumeration for all errors that can occur in the storage and history core.
//!

use derive_more::{Display, Error};
use std::io;
use std::num::ParseIntError;
use std::path::Path;

pub mod path_buf_error;
pub mod string_error;

pub use crate::error::path_buf_error::PathBufError;
pub use crate::error::string_error::StringError;

pub const NO_REPO_FOUND: &str = "not a strata repository, looking for directory: .strata";

pub const HEAD_NOT_FOUND: &str = "HEAD not found";

#[derive(Debug, Display, Error)]
pub enum StrataError {
    // CAS
    NotFound(Box<StringError>),
    InvalidHash(Box<StringError>),

    // Canonical encodings
    InvalidEncoding(StringError),
    InvariantViolated(StringError),

    // Timelines / refs
    TimelineNotFound(Box<StringError>),
    AlreadyExists(StringError),
    HeadNotFound(StringError),

    // Workspace / resources
    PathDoesNotExist(Box<PathBufError>),

    // Merge
    Conflict(Box<StringError>),
    Busy(StringError),

    // Shelf
    ShelfNotFound(Box<StringError>),

    // Cancellation
    Cancelled(StringError),

    // fs / io
    StripPrefixError(StringError),

    // External library errors
    IO(io::Error),
    TomlSer(toml::ser::Error),
    TomlDe(toml::de::Error),
    JSON(serde_json::Error),
    DB(rocksdb::Error),
    ParseIntError(ParseIntError),
    Hex(hex::FromHexError),
    Utf8(std::str::Utf8Error),

    // Fallback
    Basic(StringError),
}

impl StrataError {
    pub fn basic_str(s: impl AsRef<str>) -> Self {
        StrataError::Basic(StringError::from(s.as_ref()))
    }

    pub fn not_found(s: impl AsRef<str>) -> Self {
        StrataError::NotFound(Box::new(StringError::from(s.as_ref())))
    }

    pub fn invalid_hash(s: impl AsRef<str>) -> Self {
        StrataError::InvalidHash(Box::new(StringError::from(s.as_ref())))
    }

    pub fn invalid_encoding(s: impl AsRef<str>) -> Self {
        StrataError::InvalidEncoding(StringError::from(s.as_ref()))
    }

    pub fn invariant_violated(s: impl AsRef<str>) -> Self {
        StrataError::InvariantViolated(StringError::from(s.as_ref()))
    }

    pub fn timeline_not_found(name: impl AsRef<str>) -> Self {
        StrataError::TimelineNotFound(Box::new(StringError::from(format!(
            "timeline not found: {}",
            name.as_ref()
        ))))
    }

    pub fn already_exists(s: impl AsRef<str>) -> Self {
        StrataError::AlreadyExists(StringError::from(s.as_ref()))
    }

    pub fn path_does_not_exist(p: impl AsRef<Path>) -> Self {
        StrataError::PathDoesNotExist(Box::new(PathBufError::from(p.as_ref())))
    }

    pub fn conflict(s: impl AsRef<str>) -> Self {
        StrataError::Conflict(Box::new(StringError::from(s.as_ref())))
    }

    pub fn busy(s: impl AsRef<str>) -> Self {
        StrataError::Busy(StringError::from(s.as_ref()))
    }

    pub fn shelf_not_found(s: impl AsRef<str>) -> Self {
        StrataError::ShelfNotFound(Box::new(StringError::from(s.as_ref())))
    }

    pub fn cancelled() -> Self {
        StrataError::Cancelled(StringError::from("operation cancelled"))
    }

    /// Wraps an IO error with the path it occurred on, since `io::Error`
    /// alone drops that context by the time it reaches a caller.
    pub fn io_error_with_path(e: io::Error, path: impl AsRef<Path>) -> Self {
        StrataError::Basic(StringError::from(format!(
            "{}: {}",
            path.as_ref().display(),
            e
        )))
    }

    pub fn strip_prefix_error(e: std::path::StripPrefixError, path: impl AsRef<Path>) -> Self {
        StrataError::StripPrefixError(StringError::from(format!(
            "{}: {}",
            path.as_ref().display(),
            e
        )))
    }
}

impl From<io::Error> for StrataError {
    fn from(e: io::Error) -> Self {
        StrataError::IO(e)
    }
}

impl From<toml::ser::Error> for StrataError {
    fn from(e: toml::ser::Error) -> Self {
        StrataError::TomlSer(e)
    }
}

impl From<toml::de::Error> for StrataError {
    fn from(e: toml::de::Error) -> Self {
        StrataError::TomlDe(e)
    }
}

impl From<serde_json::Error> for StrataError {
    fn from(e: serde_json::Error) -> Self {
        StrataError::JSON(e)
    }
}

impl From<rocksdb::Error> for StrataError {
    fn from(e: rocksdb::Error) -> Self {
        StrataError::DB(e)
    }
}

impl From<ParseIntError> for StrataError {
    fn from(e: ParseIntError) -> Self {
        StrataError::ParseIntError(e)
    }
}

impl From<hex::FromHexError> for StrataError {
    fn from(e: hex::FromHexError) -> Self {
        StrataError::Hex(e)
    }
}

impl From<std::str::Utf8Error> for StrataError {
    fn from(e: std::str::Utf8Error) -> Self {
        StrataError::Utf8(e)
    }
}

impl From<std::path::StripPrefixError> for StrataError {
    fn from(e: std::path::StripPrefixError) -> Self {
        StrataError::StripPrefixError(StringError::from(e.to_string()))
    }
}
