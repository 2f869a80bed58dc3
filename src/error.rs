use std::io;

use thiserror::Error;

/// Every failure the file system surface can produce.
///
/// Each variant corresponds to one bucket of the error taxonomy: precondition,
/// argument, not-found/already-exists, resource exhaustion, busy, corruption,
/// or device. Partial I/O on `read`/`write` is never represented here — those
/// operations report a smaller-than-requested byte count as a plain `Ok`.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no file system is mounted")]
    NotMounted,

    #[error("a file system is already mounted")]
    AlreadyMounted,

    #[error("block device I/O error")]
    Device(#[source] io::Error),

    #[error("superblock signature does not match ECS150FS")]
    BadSignature,

    #[error("on-disk geometry is inconsistent: {0}")]
    BadGeometry(&'static str),

    #[error("FAT[0] is not the reserved end-of-chain sentinel")]
    BadFatReservedEntry,

    #[error("invalid file name: {0}")]
    InvalidName(&'static str),

    #[error("no file named {0:?}")]
    NotFound(String),

    #[error("a file named {0:?} already exists")]
    AlreadyExists(String),

    #[error("root directory is full")]
    RootFull,

    #[error("too many open files")]
    TooManyOpen,

    #[error("descriptor {0} is not a currently open file")]
    BadDescriptor(usize),

    #[error("{0:?} is open by {1} descriptor(s)")]
    Busy(String, usize),

    #[error("seek offset {offset} exceeds file size {size}")]
    SeekOutOfRange { offset: u64, size: u64 },

    #[error("cluster chain exceeds the disk's data-block count; treating as corruption")]
    ChainTooLong,
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        FsError::Device(e)
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
