pub mod appfs;

pub use appfs::error::AppFsError;
pub use appfs::header::Header;
pub use appfs::metadata::Metadata;
pub use appfs::page_info::{PageInfo, UsedCode};
pub use appfs::partition::{ExtractedFile, Partition, PartitionSource};
