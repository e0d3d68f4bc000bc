//! The whole image: dual-copy mount selection, metadata ping-pong writes,
//! sector read/write, file creation via page chain, file extraction by
//! chain walk.

use tracing::{debug, info, warn};

use crate::appfs::error::AppFsError;
use crate::appfs::metadata::Metadata;
use crate::appfs::page_info::{PageInfo, UsedCode};
use crate::appfs::{METADATA_COPIES, METADATA_SIZE, PAGE_COUNT, SECTOR_SIZE};

/// How a [`Partition`] is constructed: either a fresh, all-`0xFF` buffer of
/// the given size, or an existing on-disk image to mount.
pub enum PartitionSource {
    Size(usize),
    Image(Vec<u8>),
}

impl From<usize> for PartitionSource {
    fn from(size: usize) -> Self {
        PartitionSource::Size(size)
    }
}

impl From<Vec<u8>> for PartitionSource {
    fn from(image: Vec<u8>) -> Self {
        PartitionSource::Image(image)
    }
}

/// A file recovered by [`Partition::extract_file`]/[`Partition::extract_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub name: String,
    pub title: String,
    pub version: u16,
    pub contents: Vec<u8>,
}

pub struct Partition {
    data: Vec<u8>,
}

impl Partition {
    /// Builds a partition from either a size (formatted in place) or an
    /// existing byte image (mounted as-is).
    pub fn open(source: impl Into<PartitionSource>) -> Result<Self, AppFsError> {
        let data = match source.into() {
            PartitionSource::Size(size) => vec![0xFFu8; size],
            PartitionSource::Image(image) => image,
        };

        let mut partition = Partition { data };

        if partition.current_metadata().is_none() {
            let size = partition.data.len();
            let mut metadata = Metadata::new(0);
            metadata.header.set_default_magic();
            metadata.set_size(size);
            info!(
                "formatting partition ({} bytes, {} usable pages)",
                size,
                (size / SECTOR_SIZE).saturating_sub(1)
            );
            partition.set_metadata(metadata)?;

            if partition.current_metadata().is_none() {
                return Err(AppFsError::FormatFailed);
            }
        }

        Ok(partition)
    }

    pub fn create(size: usize) -> Result<Self, AppFsError> {
        Self::open(PartitionSource::Size(size))
    }

    pub fn mount(image: Vec<u8>) -> Result<Self, AppFsError> {
        Self::open(PartitionSource::Image(image))
    }

    /// The raw partition bytes, suitable for writing back to a file.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Parses the metadata copy stored at `index`, regardless of whether
    /// it is currently valid.
    fn metadata_at(&self, index: usize) -> Result<Metadata, AppFsError> {
        let offset = index * METADATA_SIZE;
        Metadata::parse(&self.data[offset..offset + METADATA_SIZE], index)
    }

    /// Selects the current metadata copy: valid magic, valid CRC, and the
    /// highest serial among qualifying candidates. A magic-valid,
    /// CRC-invalid copy is reported diagnostically and excluded from the
    /// candidate set rather than treated as an error.
    pub fn current_metadata(&self) -> Option<Metadata> {
        let mut best: Option<Metadata> = None;
        for index in 0..METADATA_COPIES {
            let candidate = match self.metadata_at(index) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if !candidate.header.check_magic() {
                continue;
            }
            if !candidate.check_crc32() {
                warn!(
                    "metadata slot {} has valid magic but invalid crc32 ({:#010x}); ignoring",
                    index,
                    candidate.header.crc32()
                );
                continue;
            }
            let replace = match &best {
                None => true,
                Some(current) => candidate.header.serial() > current.header.serial(),
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }

    /// Writes `new` into the alternate slot with the next serial and a
    /// freshly computed CRC32. The untouched slot preserves the previous
    /// valid metadata, which is what makes a torn write recoverable.
    pub fn set_metadata(&mut self, mut new: Metadata) -> Result<(), AppFsError> {
        let current = self.current_metadata();
        let (index, serial) = match &current {
            Some(current) => (
                (current.index + 1) % METADATA_COPIES,
                (current.header.serial() + 1) % 0xFFFF_FFFF,
            ),
            None => (0, 0),
        };

        new.index = index;
        new.header.set_serial(serial);
        let crc = new.calc_crc32();
        new.header.set_crc32(crc);

        let bytes = new.serialize(false);
        let offset = index * METADATA_SIZE;
        self.data[offset..offset + METADATA_SIZE].copy_from_slice(&bytes);

        debug!("committed metadata slot {} at serial {}", index, serial);
        Ok(())
    }

    pub fn get_sector(&self, index: usize) -> &[u8] {
        &self.data[index * SECTOR_SIZE..(index + 1) * SECTOR_SIZE]
    }

    pub fn set_sector(&mut self, index: usize, payload: &[u8]) -> Result<(), AppFsError> {
        if payload.len() != SECTOR_SIZE {
            return Err(AppFsError::InvalidSectorSize {
                expected: SECTOR_SIZE,
                actual: payload.len(),
            });
        }
        let offset = index * SECTOR_SIZE;
        self.data[offset..offset + SECTOR_SIZE].copy_from_slice(payload);
        Ok(())
    }

    /// Allocates free pages from the current page table, chains them,
    /// writes `payload` across their backing sectors, and commits the new
    /// metadata copy as the final step — so any failure above leaves the
    /// on-disk state unchanged.
    pub fn create_file(
        &mut self,
        name: &str,
        title: &str,
        version: u16,
        payload: &[u8],
    ) -> Result<(), AppFsError> {
        let mut metadata = self
            .current_metadata()
            .expect("partition always has valid metadata once open() has succeeded");

        let file_size = payload.len();
        let free = metadata.get_free();
        if file_size > free {
            return Err(AppFsError::InsufficientSpace {
                requested: file_size,
                free,
            });
        }

        let mut position = 0usize;
        let mut prev_index: Option<usize> = None;
        while position < file_size {
            let index = metadata
                .get_next_free_page()
                .expect("free space was checked against get_free() above");

            // Commit the previous page's forward link before moving on, so
            // the chain is always fully linked in the working copy.
            if let Some(prev_index) = prev_index {
                let prev = metadata
                    .page_mut(prev_index)
                    .expect("prev_index was a valid allocated index");
                prev.set_next_page(index as u8);
            }

            let end = (position + SECTOR_SIZE).min(file_size);
            let mut sector_data = vec![0xFFu8; SECTOR_SIZE];
            sector_data[0..end - position].copy_from_slice(&payload[position..end]);
            self.set_sector(index + 1, &sector_data)?;

            let page = metadata.page_mut(index).expect("index came from get_next_free_page");
            if prev_index.is_none() {
                page.set_name(name);
                page.set_title(title);
                page.set_version(version);
                page.set_size(file_size as u32);
            }
            page.set_next_page(0);
            page.set_used(UsedCode::Data);

            prev_index = Some(index);
            position += SECTOR_SIZE;
        }

        let page_count = prev_index.map_or(0, |_| (file_size + SECTOR_SIZE - 1) / SECTOR_SIZE);
        info!(
            "created file {:?} ({} bytes across {} page(s))",
            name, file_size, page_count
        );

        self.set_metadata(metadata)
    }

    /// Walks the page chain starting at `head_index`, collecting its
    /// payload bytes. Returns the file's metadata and contents; writing the
    /// result to disk is a CLI-adapter concern, not the core's.
    pub fn extract_file(&self, head_index: usize) -> Result<ExtractedFile, AppFsError> {
        if head_index >= PAGE_COUNT {
            return Err(AppFsError::PageOutOfRange {
                index: head_index as u32,
            });
        }

        let metadata = self
            .current_metadata()
            .expect("partition always has valid metadata once open() has succeeded");

        let head = metadata.page(head_index).expect("bounds checked above");
        let name = head.name().to_string();
        let title = head.title().to_string();
        let version = head.version();
        let file_size = head.size() as usize;

        let mut contents = Vec::with_capacity(file_size);
        let mut remaining = file_size;
        let mut current_index = head_index;
        let mut current_page: Option<&PageInfo> = Some(head);
        let mut first = true;

        while (first || current_index != 0) && remaining > 0 {
            first = false;
            let page = current_page.expect("loop condition guarantees a page while continuing");

            let take = remaining.min(SECTOR_SIZE);
            let sector = self.get_sector(current_index + 1);
            contents.extend_from_slice(&sector[..take]);
            remaining -= take;

            let next_index = page.next_page() as usize;
            current_index = next_index;
            current_page = if next_index > 0 {
                if next_index >= PAGE_COUNT {
                    return Err(AppFsError::PageOutOfRange {
                        index: next_index as u32,
                    });
                }
                Some(metadata.page(next_index).expect("bounds checked above"))
            } else {
                None
            };
        }

        if current_page.is_some() {
            warn!(
                "file {:?} declares {} bytes but its page chain continues past page {}",
                name, file_size, current_index
            );
        }

        Ok(ExtractedFile {
            name,
            title,
            version,
            contents,
        })
    }

    /// Yields one entry per head page: `used == Data` pages with a
    /// non-empty name. Continuation pages are created without a name and
    /// are skipped by this predicate.
    pub fn extract_all(&self) -> Result<Vec<ExtractedFile>, AppFsError> {
        let metadata = self
            .current_metadata()
            .expect("partition always has valid metadata once open() has succeeded");

        let mut files = Vec::new();
        for (index, page) in metadata.pages().iter().enumerate() {
            if page.used() == UsedCode::Data && !page.name().is_empty() {
                files.push(self.extract_file(index)?);
            }
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTORS_8: usize = 8 * SECTOR_SIZE;

    #[test]
    fn format_reports_usable_and_free_space() {
        let partition = Partition::create(SECTORS_8).unwrap();
        let metadata = partition.current_metadata().unwrap();
        assert_eq!(metadata.get_size(), 7 * SECTOR_SIZE);
        assert_eq!(metadata.get_free(), 7 * SECTOR_SIZE);
        assert!(metadata.header.check_magic());
        assert_eq!(metadata.header.serial(), 0);
        assert!(metadata.check_crc32());
    }

    #[test]
    fn tiny_partition_has_a_single_usable_page() {
        let partition = Partition::create(2 * SECTOR_SIZE).unwrap();
        let metadata = partition.current_metadata().unwrap();
        assert_eq!(metadata.get_size(), SECTOR_SIZE);
        assert_eq!(metadata.page(0).unwrap().used(), UsedCode::Free);
        for idx in 1..PAGE_COUNT {
            assert_eq!(metadata.page(idx).unwrap().used(), UsedCode::Illegal);
        }
    }

    #[test]
    fn small_file_round_trips() {
        let mut partition = Partition::create(SECTORS_8).unwrap();
        partition
            .create_file("app", "Hello", 1, &[0x01, 0x02, 0x03])
            .unwrap();

        let metadata = partition.current_metadata().unwrap();
        assert_eq!(metadata.header.serial(), 1);
        assert_eq!(metadata.get_free(), 6 * SECTOR_SIZE);
        let head = metadata.page(0).unwrap();
        assert_eq!(head.used(), UsedCode::Data);
        assert_eq!(head.name(), "app");
        assert_eq!(head.size(), 3);
        assert_eq!(head.next_page(), 0);

        let sector = partition.get_sector(1);
        assert_eq!(&sector[0..3], &[0x01, 0x02, 0x03]);
        assert!(sector[3..].iter().all(|&b| b == 0xFF));

        let extracted = partition.extract_file(0).unwrap();
        assert_eq!(extracted.contents, vec![0x01, 0x02, 0x03]);
        assert_eq!(extracted.name, "app");
        assert_eq!(extracted.title, "Hello");
        assert_eq!(extracted.version, 1);
    }

    #[test]
    fn multi_page_file_chains_correctly() {
        let mut partition = Partition::create(SECTORS_8).unwrap();
        let payload = vec![0xAB; 131_073];
        partition.create_file("big", "Big File", 9, &payload).unwrap();

        let metadata = partition.current_metadata().unwrap();
        let head = metadata.page(0).unwrap();
        assert_eq!(head.size(), 131_073);
        assert_eq!(head.next_page(), 1);
        assert_eq!(metadata.page(1).unwrap().next_page(), 2);
        assert_eq!(metadata.page(2).unwrap().next_page(), 0);

        let extracted = partition.extract_file(0).unwrap();
        assert_eq!(extracted.contents, payload);
    }

    #[test]
    fn out_of_space_leaves_state_untouched() {
        let mut partition = Partition::create(SECTORS_8).unwrap();
        partition.create_file("app", "Hello", 1, &[0x01, 0x02, 0x03]).unwrap();

        let free_before = partition.current_metadata().unwrap().get_free();
        let serial_before = partition.current_metadata().unwrap().header.serial();

        let err = partition
            .create_file("too-big", "x", 1, &vec![0u8; 458_753])
            .unwrap_err();
        assert!(matches!(err, AppFsError::InsufficientSpace { .. }));

        let metadata = partition.current_metadata().unwrap();
        assert_eq!(metadata.get_free(), free_before);
        assert_eq!(metadata.header.serial(), serial_before);
    }

    #[test]
    fn torn_write_recovers_previous_state() {
        let mut partition = Partition::create(SECTORS_8).unwrap();
        partition.create_file("app", "Hello", 1, &[0x01, 0x02, 0x03]).unwrap();

        // The just-written slot is whichever one now holds serial 1.
        let written = partition.current_metadata().unwrap();
        let torn_slot = written.index;
        let offset = torn_slot * METADATA_SIZE;
        let mut data = partition.data.clone();
        data[offset..offset + METADATA_SIZE].fill(0);
        let recovered = Partition::mount(data).unwrap();

        let metadata = recovered.current_metadata().unwrap();
        assert_eq!(metadata.header.serial(), 0);
        assert!(recovered.extract_all().unwrap().is_empty());
    }

    #[test]
    fn extract_all_finds_only_named_head_pages() {
        let mut partition = Partition::create(SECTORS_8).unwrap();
        partition.create_file("one", "One", 1, b"abc").unwrap();
        partition.create_file("two", "Two", 2, b"xyz").unwrap();

        let files = partition.extract_all().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "one");
        assert_eq!(files[1].name, "two");
    }

    #[test]
    fn extract_rejects_out_of_range_index() {
        let partition = Partition::create(SECTORS_8).unwrap();
        let err = partition.extract_file(PAGE_COUNT).unwrap_err();
        assert!(matches!(err, AppFsError::PageOutOfRange { .. }));
    }
}
