//! HAMT directory codec: a 32-way trie over 5-bit slices of BLAKE3(name).
//! A node is a leaf (at most `HAMT_LEAF_MAX_ENTRIES` entries, sorted by
//! name) or an internal node carrying a 32-bit occupancy bitmap and one
//! child hash per set bit, in ascending bit-position order.
//!
//! Canonical encoding: leaf = `0x00 || uvarint(k) || entries...`, where
//! each entry is `uvarint(|name|) || name || tag || hash[32] || uvarint(size)`;
//! internal = `0x01 || bitmap[4 LE] || hash[32] * popcount`.
//!

use std::collections::BTreeMap;

use crate::constants::{HAMT_BITS_PER_LEVEL, HAMT_LEAF_MAX_ENTRIES, HAMT_MAX_DEPTH};
use crate::core::cas::ContentStore;
use crate::error::StrataError;
use crate::model::dir_entry::{DirEntry, EntryRef};
use crate::model::hash::Hash;
use crate::util::varint;

const LEAF_TAG: u8 = 0x00;
const INTERNAL_TAG: u8 = 0x01;

fn slice_at_depth(name: &str, depth: u32) -> u32 {
    let name_hash = Hash::of(name.as_bytes());
    let bit_offset = depth * HAMT_BITS_PER_LEVEL;
    let byte_offset = (bit_offset / 8) as usize;
    let bit_shift = bit_offset % 8;

    // Read a 16-bit window so a 5-bit slice never spans past the buffer.
    let bytes = name_hash.as_bytes();
    let hi = *bytes.get(byte_offset).unwrap_or(&0) as u32;
    let lo = *bytes.get(byte_offset + 1).unwrap_or(&0) as u32;
    let window = (hi << 8) | lo;
    (window >> (11 - bit_shift)) & 0b1_1111
}

fn encode_entry(out: &mut Vec<u8>, entry: &DirEntry) {
    varint::encode_str(out, &entry.name);
    out.push(entry.entry.tag());
    out.extend_from_slice(entry.entry.hash().as_bytes());
    varint::encode_u64(out, entry.entry.size());
}

fn decode_entry(data: &[u8], cursor: &mut usize) -> Result<DirEntry, StrataError> {
    let name = varint::decode_str(data, cursor)?;
    let tag = *data
        .get(*cursor)
        .ok_or_else(|| StrataError::invalid_encoding("truncated hamt entry tag"))?;
    *cursor += 1;
    if data.len() < *cursor + 32 {
        return Err(StrataError::invalid_encoding("truncated hamt entry hash"));
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[*cursor..*cursor + 32]);
    *cursor += 32;
    let hash = Hash::new(bytes);
    let size = varint::decode_u64(data, cursor)?;
    let entry = match tag {
        0 => EntryRef::File { hash, size },
        1 => EntryRef::Dir { hash, size },
        2 => EntryRef::Submodule { hash, size },
        other => {
            return Err(StrataError::invalid_encoding(format!(
                "unknown hamt entry tag {other}"
            )))
        }
    };
    Ok(DirEntry { name, entry })
}

enum Node {
    Leaf(Vec<DirEntry>),
    Internal { bitmap: u32, children: Vec<Hash> },
}

impl Node {
    fn encode(&self) -> Vec<u8> {
        match self {
            Node::Leaf(entries) => {
                let mut out = vec![LEAF_TAG];
                varint::encode_u64(&mut out, entries.len() as u64);
                for entry in entries {
                    encode_entry(&mut out, entry);
                }
                out
            }
            Node::Internal { bitmap, children } => {
                let mut out = vec![INTERNAL_TAG];
                out.extend_from_slice(&bitmap.to_le_bytes());
                for child in children {
                    out.extend_from_slice(child.as_bytes());
                }
                out
            }
        }
    }

    fn decode(data: &[u8]) -> Result<Node, StrataError> {
        let tag = *data
            .first()
            .ok_or_else(|| StrataError::invalid_encoding("empty hamt node"))?;
        match tag {
            LEAF_TAG => {
                let mut cursor = 1usize;
                let k = varint::decode_u64(data, &mut cursor)? as usize;
                let mut entries = Vec::with_capacity(k);
                for _ in 0..k {
                    entries.push(decode_entry(data, &mut cursor)?);
                }
                Ok(Node::Leaf(entries))
            }
            INTERNAL_TAG => {
                if data.len() < 5 {
                    return Err(StrataError::invalid_encoding("truncated hamt internal"));
                }
                let bitmap = u32::from_le_bytes(data[1..5].try_into().unwrap());
                let popcount = bitmap.count_ones() as usize;
                let mut cursor = 5usize;
                let mut children = Vec::with_capacity(popcount);
                for _ in 0..popcount {
                    if data.len() < cursor + 32 {
                        return Err(StrataError::invalid_encoding("truncated hamt internal child"));
                    }
                    let mut bytes = [0u8; 32];
                    bytes.copy_from_slice(&data[cursor..cursor + 32]);
                    cursor += 32;
                    children.push(Hash::new(bytes));
                }
                Ok(Node::Internal { bitmap, children })
            }
            other => Err(StrataError::invalid_encoding(format!(
                "unknown hamt node tag {other}"
            ))),
        }
    }
}

/// Builds a HAMT from a set of entries with unique names and returns the
/// root hash. Entries are sorted by name before encoding.
pub fn build(cas: &dyn ContentStore, entries: Vec<DirEntry>) -> Result<Hash, StrataError> {
    build_at_depth(cas, entries, 0)
}

fn build_at_depth(
    cas: &dyn ContentStore,
    mut entries: Vec<DirEntry>,
    depth: u32,
) -> Result<Hash, StrataError> {
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    if entries.len() <= HAMT_LEAF_MAX_ENTRIES || depth >= HAMT_MAX_DEPTH {
        let node = Node::Leaf(entries);
        return cas.write(&node.encode());
    }

    let mut buckets: BTreeMap<u32, Vec<DirEntry>> = BTreeMap::new();
    for entry in entries {
        let slice = slice_at_depth(&entry.name, depth);
        buckets.entry(slice).or_default().push(entry);
    }

    let mut bitmap = 0u32;
    let mut children = Vec::with_capacity(buckets.len());
    for (slice, bucket) in buckets {
        bitmap |= 1 << slice;
        children.push(build_at_depth(cas, bucket, depth + 1)?);
    }

    let node = Node::Internal { bitmap, children };
    cas.write(&node.encode())
}

/// Looks up `name` directly under `root`, recursively descending internal
/// nodes by the name's 5-bit slice at each depth.
pub fn lookup(
    cas: &dyn ContentStore,
    root: &Hash,
    name: &str,
) -> Result<Option<DirEntry>, StrataError> {
    lookup_at_depth(cas, root, name, 0)
}

fn lookup_at_depth(
    cas: &dyn ContentStore,
    hash: &Hash,
    name: &str,
    depth: u32,
) -> Result<Option<DirEntry>, StrataError> {
    match Node::decode(&cas.get(hash)?)? {
        Node::Leaf(entries) => Ok(entries.into_iter().find(|e| e.name == name)),
        Node::Internal { bitmap, children } => {
            let slice = slice_at_depth(name, depth);
            if bitmap & (1 << slice) == 0 {
                return Ok(None);
            }
            let child_index = (bitmap & ((1u32 << slice) - 1)).count_ones() as usize;
            lookup_at_depth(cas, &children[child_index], name, depth + 1)
        }
    }
}

/// Returns every entry reachable from `root`, collapsing internal
/// indirection, sorted by name.
pub fn list(cas: &dyn ContentStore, root: &Hash) -> Result<Vec<DirEntry>, StrataError> {
    let mut out = Vec::new();
    collect(cas, root, &mut out)?;
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn collect(cas: &dyn ContentStore, hash: &Hash, out: &mut Vec<DirEntry>) -> Result<(), StrataError> {
    match Node::decode(&cas.get(hash)?)? {
        Node::Leaf(entries) => {
            out.extend(entries);
            Ok(())
        }
        Node::Internal { children, .. } => {
            for child in children {
                collect(cas, &child, out)?;
            }
            Ok(())
        }
    }
}

/// Visits every entry reachable from `root`, recursing into `Dir` entries,
/// calling `visit` with each entry's path relative to `root`.
pub fn walk(
    cas: &dyn ContentStore,
    root: &Hash,
    visit: &mut dyn FnMut(&str, &EntryRef) -> Result<(), StrataError>,
) -> Result<(), StrataError> {
    walk_prefixed(cas, root, "", visit)
}

fn walk_prefixed(
    cas: &dyn ContentStore,
    hash: &Hash,
    prefix: &str,
    visit: &mut dyn FnMut(&str, &EntryRef) -> Result<(), StrataError>,
) -> Result<(), StrataError> {
    for entry in list(cas, hash)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        visit(&path, &entry.entry)?;
        if entry.entry.is_dir() {
            walk_prefixed(cas, &entry.entry.hash(), &path, visit)?;
        }
    }
    Ok(())
}

/// Composes `lookup` across a forward-slash separated path, failing if any
/// intermediate component is missing or not a directory.
pub fn path_lookup(
    cas: &dyn ContentStore,
    root: &Hash,
    path: &str,
) -> Result<Option<EntryRef>, StrataError> {
    let mut current = *root;
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty() {
        return Ok(Some(EntryRef::Dir {
            hash: *root,
            size: 0,
        }));
    }

    for (i, component) in components.iter().enumerate() {
        match lookup(cas, &current, component)? {
            None => return Ok(None),
            Some(entry) => {
                let is_last = i + 1 == components.len();
                if is_last {
                    return Ok(Some(entry.entry));
                }
                if !entry.entry.is_dir() {
                    return Err(StrataError::path_does_not_exist(path));
                }
                current = entry.entry.hash();
            }
        }
    }
    Ok(None)
}
