//! The 128-byte metadata `Header`: magic, serial, crc32, reserved.

use crate::appfs::codec::{read_u32_le, write_u32_le};
use crate::appfs::error::AppFsError;
use crate::appfs::{DESCRIPTOR_SIZE, MAGIC};

const RESERVED_SIZE: usize = DESCRIPTOR_SIZE - 8 - 4 - 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    magic: [u8; 8],
    serial: u32,
    crc32: u32,
    reserved: [u8; RESERVED_SIZE],
}

impl Header {
    /// A freshly-allocated, unformatted header: every byte `0xFF`.
    pub fn new() -> Self {
        Header {
            magic: [0xFF; 8],
            serial: 0xFFFF_FFFF,
            crc32: 0xFFFF_FFFF,
            reserved: [0xFF; RESERVED_SIZE],
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, AppFsError> {
        if buf.len() != DESCRIPTOR_SIZE {
            return Err(AppFsError::InvalidLength {
                expected: DESCRIPTOR_SIZE,
                actual: buf.len(),
            });
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buf[0..8]);
        let serial = read_u32_le(&buf[8..12]);
        let crc32 = read_u32_le(&buf[12..16]);
        let mut reserved = [0u8; RESERVED_SIZE];
        reserved.copy_from_slice(&buf[16..DESCRIPTOR_SIZE]);

        Ok(Header {
            magic,
            serial,
            crc32,
            reserved,
        })
    }

    /// Serializes the header. When `zero_crc` is set, the crc32 field is
    /// written as four zero bytes instead of the stored value — used when
    /// computing the checksum that value is meant to validate.
    pub fn serialize(&self, zero_crc: bool) -> [u8; DESCRIPTOR_SIZE] {
        let mut out = [0u8; DESCRIPTOR_SIZE];
        out[0..8].copy_from_slice(&self.magic);
        out[8..12].copy_from_slice(&write_u32_le(self.serial));
        if zero_crc {
            out[12..16].copy_from_slice(&[0, 0, 0, 0]);
        } else {
            out[12..16].copy_from_slice(&write_u32_le(self.crc32));
        }
        out[16..DESCRIPTOR_SIZE].copy_from_slice(&self.reserved);
        out
    }

    pub fn magic(&self) -> &[u8; 8] {
        &self.magic
    }

    pub fn set_magic(&mut self, value: [u8; 8]) {
        self.magic = value;
    }

    pub fn set_default_magic(&mut self) {
        self.magic = *MAGIC;
    }

    pub fn check_magic(&self) -> bool {
        &self.magic == MAGIC
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn set_serial(&mut self, value: u32) {
        self.serial = value;
    }

    pub fn crc32(&self) -> u32 {
        self.crc32
    }

    pub fn set_crc32(&mut self, value: u32) {
        self.crc32 = value;
    }
}

impl Default for Header {
    fn default() -> Self {
        Header::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        let err = Header::parse(&[0u8; 127]).unwrap_err();
        assert!(matches!(err, AppFsError::InvalidLength { expected: 128, actual: 127 }));
    }

    #[test]
    fn round_trips_through_serialize() {
        let mut h = Header::new();
        h.set_default_magic();
        h.set_serial(7);
        h.set_crc32(0x1234_5678);
        let bytes = h.serialize(false);
        let parsed = Header::parse(&bytes).unwrap();
        assert_eq!(parsed, h);
        assert!(parsed.check_magic());
    }

    #[test]
    fn zero_crc_serialization_zeroes_only_crc_field() {
        let mut h = Header::new();
        h.set_crc32(0xAABB_CCDD);
        let bytes = h.serialize(true);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &write_u32_le(h.serial()));
    }
}
