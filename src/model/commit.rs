//! The commit object: an immutable snapshot referencing a root tree and
//! its parents. Canonical text encoding is defined here because it is
//! what gets BLAKE3-hashed to produce the commit's identity.
//!

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::StrataError;
use crate::model::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: Hash,
    pub parents: Vec<Hash>,
    pub author: Identity,
    pub author_timestamp: OffsetDateTime,
    pub committer: Identity,
    pub committer_timestamp: OffsetDateTime,
    pub message: String,
    /// Position assigned in the MMR history log; `None` until sealed.
    pub mmr_position: Option<u64>,
}

impl Commit {
    /// Canonical textual encoding. This is the exact byte sequence that
    /// gets BLAKE3-hashed to produce the commit's identity, so every
    /// field order and format here is load-bearing.
    pub fn canonical_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree.to_hex()));
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent.to_hex()));
        }
        out.push_str(&format!(
            "author {} {} +0000\n",
            self.author,
            self.author_timestamp.unix_timestamp()
        ));
        out.push_str(&format!(
            "committer {} {} +0000\n",
            self.committer,
            self.committer_timestamp.unix_timestamp()
        ));
        if let Some(pos) = self.mmr_position {
            out.push_str(&format!("mmr-position {pos}\n"));
        }
        out.push('\n');
        out.push_str(&self.message);
        out.push('\n');
        out
    }

    pub fn hash(&self) -> Hash {
        Hash::of(self.canonical_text().as_bytes())
    }

    pub fn from_canonical_text(text: &str) -> Result<Self, StrataError> {
        let mut lines = text.lines();
        let mut tree: Option<Hash> = None;
        let mut parents = Vec::new();
        let mut author: Option<Identity> = None;
        let mut author_timestamp: Option<OffsetDateTime> = None;
        let mut committer: Option<Identity> = None;
        let mut committer_timestamp: Option<OffsetDateTime> = None;
        let mut mmr_position = None;

        for line in &mut lines {
            if line.is_empty() {
                break;
            }
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Some(rest.parse()?);
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(rest.parse()?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                let (id, ts) = parse_identity_line(rest)?;
                author = Some(id);
                author_timestamp = Some(ts);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                let (id, ts) = parse_identity_line(rest)?;
                committer = Some(id);
                committer_timestamp = Some(ts);
            } else if let Some(rest) = line.strip_prefix("mmr-position ") {
                mmr_position = Some(rest.parse::<u64>()?);
            } else {
                return Err(StrataError::invalid_encoding(format!(
                    "unrecognized commit header line: {line}"
                )));
            }
        }

        let message = lines.collect::<Vec<_>>().join("\n");

        Ok(Commit {
            tree: tree.ok_or_else(|| StrataError::invalid_encoding("commit missing tree"))?,
            parents,
            author: author.ok_or_else(|| StrataError::invalid_encoding("commit missing author"))?,
            author_timestamp: author_timestamp
                .ok_or_else(|| StrataError::invalid_encoding("commit missing author timestamp"))?,
            committer: committer
                .ok_or_else(|| StrataError::invalid_encoding("commit missing committer"))?,
            committer_timestamp: committer_timestamp.ok_or_else(|| {
                StrataError::invalid_encoding("commit missing committer timestamp")
            })?,
            message,
            mmr_position,
        })
    }
}

/// Parses `Name <email> 1234567890 +0000` into an identity and timestamp.
fn parse_identity_line(s: &str) -> Result<(Identity, OffsetDateTime), StrataError> {
    let email_start = s
        .find('<')
        .ok_or_else(|| StrataError::invalid_encoding("identity line missing '<'"))?;
    let email_end = s
        .find('>')
        .ok_or_else(|| StrataError::invalid_encoding("identity line missing '>'"))?;
    let name = s[..email_start].trim().to_string();
    let email = s[email_start + 1..email_end].to_string();
    let rest = s[email_end + 1..].trim();
    let unix_str = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| StrataError::invalid_encoding("identity line missing timestamp"))?;
    let unix: i64 = unix_str.parse()?;
    let ts = OffsetDateTime::from_unix_timestamp(unix)
        .map_err(|e| StrataError::invalid_encoding(e.to_string()))?;
    Ok((Identity { name, email }, ts))
}
