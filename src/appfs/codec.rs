//! Primitive wire codecs: little-endian fixed-width integers and
//! NUL-padded ASCII strings, shared by `Header`, `PageInfo` and `Metadata`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Reads a little-endian `u16` from the first two bytes of `buf`.
///
/// Callers are expected to have already validated `buf`'s total length
/// against the owning record's fixed width, the same contract the teacher's
/// `FILHeader::from_bytes` relies on for its own field-by-field reads.
pub fn read_u16_le(buf: &[u8]) -> u16 {
    let mut cursor = Cursor::new(buf);
    cursor
        .read_u16::<LittleEndian>()
        .expect("field slice must be at least 2 bytes")
}

pub fn read_u32_le(buf: &[u8]) -> u32 {
    let mut cursor = Cursor::new(buf);
    cursor
        .read_u32::<LittleEndian>()
        .expect("field slice must be at least 4 bytes")
}

pub fn write_u16_le(value: u16) -> [u8; 2] {
    let mut out = Vec::with_capacity(2);
    out.write_u16::<LittleEndian>(value)
        .expect("writing into a Vec cannot fail");
    out.try_into().expect("exactly 2 bytes were written")
}

pub fn write_u32_le(value: u32) -> [u8; 4] {
    let mut out = Vec::with_capacity(4);
    out.write_u32::<LittleEndian>(value)
        .expect("writing into a Vec cannot fail");
    out.try_into().expect("exactly 4 bytes were written")
}

/// Packs `value` into a `width`-byte ASCII field: truncated to `width - 1`
/// bytes and NUL-padded. Inputs exceeding the field width are truncated
/// without error, per spec.
pub fn pack_ascii(value: &str, width: usize) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.truncate(width - 1);
    bytes.resize(width, 0);
    bytes
}

/// Unpacks a NUL-padded ASCII field, truncating at the first NUL byte.
///
/// Matches `appfs.py`'s `get_name`/`get_title`: if no NUL byte is present at
/// all (e.g. a freshly-formatted, all-`0xFF` page that was never named),
/// the terminator defaults to position 0 and the field decodes as empty
/// rather than as raw non-ASCII bytes.
pub fn unpack_ascii(buf: &[u8]) -> String {
    let terminator = buf.iter().position(|&b| b == 0).unwrap_or(0);
    String::from_utf8_lossy(&buf[..terminator]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_integers() {
        assert_eq!(read_u16_le(&write_u16_le(0xBEEF)), 0xBEEF);
        assert_eq!(read_u32_le(&write_u32_le(0xDEAD_BEEF)), 0xDEAD_BEEF);
    }

    #[test]
    fn pack_truncates_without_error() {
        let packed = pack_ascii(&"x".repeat(100), 48);
        assert_eq!(packed.len(), 48);
        assert_eq!(&packed[0..47], "x".repeat(47).as_bytes());
        assert_eq!(packed[47], 0);
    }

    #[test]
    fn unpack_stops_at_first_nul() {
        let mut buf = vec![b'a', b'p', b'p', 0, 0xFF, 0xFF];
        assert_eq!(unpack_ascii(&buf), "app");
        buf = vec![0xFF; 6];
        assert_eq!(unpack_ascii(&buf), "");
    }
}
