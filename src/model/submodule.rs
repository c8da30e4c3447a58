//! A versioned reference to another repository. The core stores and
//! hashes these references but never clones, updates, or recurses into
//! them; lifecycle is owned by the boundary layer that embeds this core.
//!

use crate::error::StrataError;
use crate::model::hash::Hash;
use crate::util::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submodule {
    pub url: String,
    pub path: String,
    pub timeline: String,
    pub commit_hash: Hash,
    pub shallow: bool,
    pub freeze: bool,
}

const FLAG_SHALLOW: u64 = 1 << 0;
const FLAG_FREEZE: u64 = 1 << 1;

impl Submodule {
    /// `0x01 || uvarint(|url|) || url || uvarint(|path|) || path ||
    ///  uvarint(|timeline|) || timeline || commit_hash[32] || uvarint(flags)`
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = vec![0x01u8];
        varint::encode_str(&mut out, &self.url);
        varint::encode_str(&mut out, &self.path);
        varint::encode_str(&mut out, &self.timeline);
        out.extend_from_slice(self.commit_hash.as_bytes());
        let mut flags = 0u64;
        if self.shallow {
            flags |= FLAG_SHALLOW;
        }
        if self.freeze {
            flags |= FLAG_FREEZE;
        }
        varint::encode_u64(&mut out, flags);
        out
    }

    pub fn hash(&self) -> Hash {
        Hash::of(&self.canonical_bytes())
    }

    pub fn from_canonical_bytes(data: &[u8]) -> Result<Self, StrataError> {
        let mut cursor = 0usize;
        let tag = *data
            .first()
            .ok_or_else(|| StrataError::invalid_encoding("empty submodule bytes"))?;
        if tag != 0x01 {
            return Err(StrataError::invalid_encoding("bad submodule tag"));
        }
        cursor += 1;
        let url = varint::decode_str(data, &mut cursor)?;
        let path = varint::decode_str(data, &mut cursor)?;
        let timeline = varint::decode_str(data, &mut cursor)?;
        if data.len() < cursor + 32 {
            return Err(StrataError::invalid_encoding("truncated submodule hash"));
        }
        let mut hash_bytes = [0u8; 32];
        hash_bytes.copy_from_slice(&data[cursor..cursor + 32]);
        cursor += 32;
        let commit_hash = Hash::new(hash_bytes);
        let flags = varint::decode_u64(data, &mut cursor)?;
        Ok(Submodule {
            url,
            path,
            timeline,
            commit_hash,
            shallow: flags & FLAG_SHALLOW != 0,
            freeze: flags & FLAG_FREEZE != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submodule_roundtrip() {
        let sub = Submodule {
            url: "https://example.com/repo.git".to_string(),
            path: "vendor/repo".to_string(),
            timeline: "main".to_string(),
            commit_hash: Hash::of(b"commit"),
            shallow: true,
            freeze: false,
        };
        let bytes = sub.canonical_bytes();
        let parsed = Submodule::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(sub, parsed);
    }
}
