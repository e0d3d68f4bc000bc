//! One metadata copy: a `Header` followed by `PAGE_COUNT` `PageInfo`
//! entries, plus CRC computation and page-table queries.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::appfs::error::AppFsError;
use crate::appfs::header::Header;
use crate::appfs::page_info::{PageInfo, UsedCode};
use crate::appfs::{DESCRIPTOR_SIZE, METADATA_SIZE, PAGE_COUNT, SECTOR_SIZE};

/// IEEE 802.3 CRC32 (the same polynomial as zlib/zip/Ethernet).
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Which of the two on-disk slots this copy was read from, or will be
    /// written to. Not part of the serialized bytes.
    pub index: usize,
    pub header: Header,
    pages: Vec<PageInfo>,
}

impl Metadata {
    pub fn new(index: usize) -> Self {
        Metadata {
            index,
            header: Header::new(),
            pages: (0..PAGE_COUNT).map(|_| PageInfo::new()).collect(),
        }
    }

    pub fn parse(buf: &[u8], index: usize) -> Result<Self, AppFsError> {
        if buf.len() != METADATA_SIZE {
            return Err(AppFsError::InvalidLength {
                expected: METADATA_SIZE,
                actual: buf.len(),
            });
        }

        let header = Header::parse(&buf[0..DESCRIPTOR_SIZE])?;
        let mut pages = Vec::with_capacity(PAGE_COUNT);
        for page_index in 0..PAGE_COUNT {
            let offset = DESCRIPTOR_SIZE + DESCRIPTOR_SIZE * page_index;
            pages.push(PageInfo::parse(&buf[offset..offset + DESCRIPTOR_SIZE])?);
        }

        Ok(Metadata {
            index,
            header,
            pages,
        })
    }

    pub fn serialize(&self, zero_crc: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(METADATA_SIZE);
        out.extend_from_slice(&self.header.serialize(zero_crc));
        for page in &self.pages {
            out.extend_from_slice(&page.serialize());
        }
        out
    }

    pub fn calc_crc32(&self) -> u32 {
        CRC32.checksum(&self.serialize(true))
    }

    pub fn check_crc32(&self) -> bool {
        self.header.crc32() == self.calc_crc32()
    }

    /// Marks every page backed by a sector beyond `partition_size` as
    /// permanently `Illegal`. Pages within range are left untouched.
    ///
    /// Sector 0 holds the metadata, not a page, so a partition of
    /// `partition_size / SECTOR_SIZE` total sectors has one fewer usable
    /// page than that (spec.md §3: "Sectors 1..P store page payloads").
    pub fn set_size(&mut self, partition_size: usize) {
        let valid_pages = (partition_size / SECTOR_SIZE).saturating_sub(1);
        for page in self.pages.iter_mut().skip(valid_pages) {
            page.set_used(UsedCode::Illegal);
        }
    }

    /// Usable size: pages that are either holding data or still free.
    pub fn get_size(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.used(), UsedCode::Data | UsedCode::Free))
            .count()
            * SECTOR_SIZE
    }

    pub fn get_free(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.used() == UsedCode::Free)
            .count()
            * SECTOR_SIZE
    }

    /// Index of the first free page, ascending, if any.
    pub fn get_next_free_page(&self) -> Option<usize> {
        self.pages.iter().position(|p| p.used() == UsedCode::Free)
    }

    pub fn page(&self, index: usize) -> Option<&PageInfo> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut PageInfo> {
        self.pages.get_mut(index)
    }

    pub fn set_page(&mut self, index: usize, page: PageInfo) {
        self.pages[index] = page;
    }

    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    /// A diagnostic one-character-per-page usage grid (`D`/`F`/`X`),
    /// wrapped every 64 columns, in the style of the original `appfs.py`
    /// `print_usage`.
    pub fn print_usage(&self) -> String {
        let mut out = String::from("H");
        for (i, page) in self.pages.iter().enumerate() {
            out.push(match page.used() {
                UsedCode::Data => 'D',
                UsedCode::Free => 'F',
                UsedCode::Illegal => 'X',
            });
            if (i + 1) % 64 == 63 {
                out.push('\n');
            }
        }
        out
    }
}
