//! The wire format shared by [`Transport`](../mrlite_transport) framing and
//! [`SortedBuffer`](../mrlite_sorted) spill files: every length-prefixed
//! field is a 4-byte unsigned little-endian length followed by that many
//! bytes. Fixed explicitly to little-endian per the redesign note in
//! spec.md §9 — the original assumed host-native byte order.

use crate::error::WireError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Writes one length-prefixed field: `[len:u32 LE][bytes]`.
pub fn write_length_prefixed<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    w.write_all(bytes)?;
    Ok(())
}

/// Reads one length-prefixed field written by [`write_length_prefixed`].
pub fn read_length_prefixed<R: Read>(r: &mut R) -> Result<Vec<u8>, WireError> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            WireError::Truncated
        } else {
            WireError::Io(err)
        }
    })?;
    Ok(buf)
}

/// Encodes a `(key, value)` pair as the transport's non-terminator payload:
/// `[klen:u32][vlen:u32][key][value]`.
pub fn encode_record(key: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + key.len() + value.len());
    out.write_u32::<LittleEndian>(key.len() as u32).unwrap();
    out.write_u32::<LittleEndian>(value.len() as u32).unwrap();
    out.extend_from_slice(key);
    out.extend_from_slice(value);
    out
}

/// Decodes a payload written by [`encode_record`].
pub fn decode_record(payload: &[u8]) -> Result<(Vec<u8>, Vec<u8>), WireError> {
    let mut cursor = io::Cursor::new(payload);
    let klen = cursor.read_u32::<LittleEndian>()? as usize;
    let vlen = cursor.read_u32::<LittleEndian>()? as usize;
    let header = cursor.position() as usize;
    if payload.len() < header + klen + vlen {
        return Err(WireError::Truncated);
    }
    let key = payload[header..header + klen].to_vec();
    let value = payload[header + klen..header + klen + vlen].to_vec();
    Ok((key, value))
}

/// The combined size of a record as counted against `max_map_output_size`:
/// `klen + vlen + 8` (the two 4-byte length prefixes).
pub fn record_wire_size(key: &[u8], value: &[u8]) -> u64 {
    key.len() as u64 + value.len() as u64 + 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrips() {
        let encoded = encode_record(b"fox", b"2");
        let (k, v) = decode_record(&encoded).unwrap();
        assert_eq!(k, b"fox");
        assert_eq!(v, b"2");
    }

    #[test]
    fn empty_key_and_value_roundtrip() {
        let encoded = encode_record(b"", b"");
        let (k, v) = decode_record(&encoded).unwrap();
        assert!(k.is_empty());
        assert!(v.is_empty());
    }

    #[test]
    fn length_prefixed_roundtrips() {
        let mut buf = Vec::new();
        write_length_prefixed(&mut buf, b"hello").unwrap();
        let mut cursor = io::Cursor::new(buf);
        assert_eq!(read_length_prefixed(&mut cursor).unwrap(), b"hello");
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut bad = Vec::new();
        bad.write_u32::<LittleEndian>(5).unwrap();
        bad.write_u32::<LittleEndian>(5).unwrap();
        bad.extend_from_slice(b"ab");
        assert!(decode_record(&bad).is_err());
    }
}
