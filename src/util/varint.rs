//! Minimal unsigned LEB128 ("uvarint") encoding for lengths and sizes in
//! canonical object bytes. No varint crate appears anywhere in the
//! codebases this library was grown from, and the format is small and
//! fully pinned by the canonical-encoding contract, so it is hand-rolled
//! here rather than reached for externally.
//!

use crate::error::StrataError;

pub fn encode_u64(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        } else {
            out.push(byte | 0x80);
        }
    }
}

pub fn decode_u64(data: &[u8], cursor: &mut usize) -> Result<u64, StrataError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = *data
            .get(*cursor)
            .ok_or_else(|| StrataError::invalid_encoding("truncated uvarint"))?;
        *cursor += 1;
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(StrataError::invalid_encoding("uvarint too long"));
        }
    }
}

pub fn encode_str(out: &mut Vec<u8>, s: &str) {
    encode_u64(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

pub fn decode_str(data: &[u8], cursor: &mut usize) -> Result<String, StrataError> {
    let len = decode_u64(data, cursor)? as usize;
    let end = *cursor + len;
    if data.len() < end {
        return Err(StrataError::invalid_encoding("truncated string"));
    }
    let s = std::str::from_utf8(&data[*cursor..end])?.to_string();
    *cursor = end;
    Ok(s)
}

pub fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    encode_u64(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

pub fn decode_bytes(data: &[u8], cursor: &mut usize) -> Result<Vec<u8>, StrataError> {
    let len = decode_u64(data, cursor)? as usize;
    let end = *cursor + len;
    if data.len() < end {
        return Err(StrataError::invalid_encoding("truncated bytes"));
    }
    let out = data[*cursor..end].to_vec();
    *cursor = end;
    Ok(out)
}
