//! Typed error kinds surfaced by the core (spec section 7).
//!
//! These mirror the `ValueError`/`Exception` call sites of the original
//! `appfs.py`, but as a closed, matchable enum the way the rest of this
//! corpus models on-disk-format errors (see e.g. `dbheader::Error`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppFsError {
    #[error("expected a buffer of exactly {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("serial must be encoded as exactly 4 bytes")]
    InvalidSerial,

    #[error("crc32 must be encoded as exactly 4 bytes")]
    InvalidCrc32,

    #[error("sector payload must be exactly {expected} bytes, got {actual}")]
    InvalidSectorSize { expected: usize, actual: usize },

    #[error("partition must be constructed from either a size or an existing image")]
    InvalidPartitionArgument,

    #[error("partition did not mount after formatting; backing buffer is corrupt")]
    FormatFailed,

    #[error("file requires {requested} bytes but only {free} are free")]
    InsufficientSpace { requested: usize, free: usize },

    #[error("page index {index} is out of range")]
    PageOutOfRange { index: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
