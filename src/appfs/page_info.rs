//! The 128-byte per-page `PageInfo` descriptor.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::debug;

use crate::appfs::codec::{
    pack_ascii, read_u16_le, read_u32_le, unpack_ascii, write_u32_le,
};
use crate::appfs::error::AppFsError;
use crate::appfs::{DESCRIPTOR_SIZE, NAME_FIELD_WIDTH, TITLE_FIELD_WIDTH};

const SIZE_OFFSET: usize = NAME_FIELD_WIDTH + TITLE_FIELD_WIDTH;
const NEXT_PAGE_OFFSET: usize = SIZE_OFFSET + 4;
const USED_OFFSET: usize = NEXT_PAGE_OFFSET + 1;
const VERSION_OFFSET: usize = USED_OFFSET + 1;
const RESERVED_OFFSET: usize = VERSION_OFFSET + 2;
const RESERVED_SIZE: usize = DESCRIPTOR_SIZE - RESERVED_OFFSET;

/// A page's occupancy state (spec section 3, "Used-codes").
#[derive(Clone, Copy, Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum UsedCode {
    Data = 0x00,
    Illegal = 0x55,
    Free = 0xFF,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    name: String,
    title: String,
    size: u32,
    next_page: u8,
    used: UsedCode,
    version: u16,
    reserved: [u8; RESERVED_SIZE],
}

impl PageInfo {
    /// A freshly-allocated, unformatted descriptor: every byte `0xFF`,
    /// which decodes as an empty name/title and `used = Free`.
    pub fn new() -> Self {
        PageInfo {
            name: String::new(),
            title: String::new(),
            size: 0xFFFF_FFFF,
            next_page: 0xFF,
            used: UsedCode::Free,
            version: 0xFFFF,
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

        let name = unpack_ascii(&buf[0..NAME_FIELD_WIDTH]);
        let title = unpack_ascii(&buf[NAME_FIELD_WIDTH..SIZE_OFFSET]);
        let size = read_u32_le(&buf[SIZE_OFFSET..NEXT_PAGE_OFFSET]);
        let next_page = buf[NEXT_PAGE_OFFSET];
        let used = UsedCode::try_from_primitive(buf[USED_OFFSET]).unwrap_or_else(|e| {
            debug!("invalid used byte {:#x}: {:?}, treating page as illegal", buf[USED_OFFSET], e);
            UsedCode::Illegal
        });
        let version = read_u16_le(&buf[VERSION_OFFSET..RESERVED_OFFSET]);
        let mut reserved = [0u8; RESERVED_SIZE];
        reserved.copy_from_slice(&buf[RESERVED_OFFSET..DESCRIPTOR_SIZE]);

        Ok(PageInfo {
            name,
            title,
            size,
            next_page,
            used,
            version,
            reserved,
        })
    }

    pub fn serialize(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut out = [0u8; DESCRIPTOR_SIZE];
        out[0..NAME_FIELD_WIDTH].copy_from_slice(&pack_ascii(&self.name, NAME_FIELD_WIDTH));
        out[NAME_FIELD_WIDTH..SIZE_OFFSET].copy_from_slice(&pack_ascii(&self.title, TITLE_FIELD_WIDTH));
        out[SIZE_OFFSET..NEXT_PAGE_OFFSET].copy_from_slice(&write_u32_le(self.size));
        out[NEXT_PAGE_OFFSET] = self.next_page;
        out[USED_OFFSET] = self.used.into();
        out[VERSION_OFFSET..RESERVED_OFFSET].copy_from_slice(&self.version.to_le_bytes());
        out[RESERVED_OFFSET..DESCRIPTOR_SIZE].copy_from_slice(&self.reserved);
        out
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names longer than 47 bytes are truncated without error.
    pub fn set_name(&mut self, name: &str) {
        self.name = unpack_ascii(&pack_ascii(name, NAME_FIELD_WIDTH));
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Titles longer than 63 bytes are truncated without error.
    pub fn set_title(&mut self, title: &str) {
        self.title = unpack_ascii(&pack_ascii(title, TITLE_FIELD_WIDTH));
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    pub fn next_page(&self) -> u8 {
        self.next_page
    }

    pub fn set_next_page(&mut self, next_page: u8) {
        self.next_page = next_page;
    }

    pub fn used(&self) -> UsedCode {
        self.used
    }

    pub fn set_used(&mut self, used: UsedCode) {
        self.used = used;
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn set_version(&mut self, version: u16) {
        self.version = version;
    }
}

impl Default for PageInfo {
    fn default() -> Self {
        PageInfo::new()
    }
}
