/*!
 * ECS150FS — a small, single-mount, FAT-style block file system.
 *
 * A mounted disk is a sequence of fixed 4096-byte blocks:
 *
 * .                | blocks
 * superblock        | [0, 1)
 * FAT               | [1, 1+F)
 * root directory    | [1+F, 2+F)
 * data region       | [2+F, total_disk_blocks)
 *
 * Files are flat (no subdirectories), addressed by a name up to 15 bytes,
 * and stored as a chain of data blocks linked through the FAT. The root
 * directory holds at most 128 files; at most 32 may be open at once.
 *
 * [`Fs`] is generic over [`BlockDevice`] so the engine never assumes a
 * concrete storage backend — a real file ([`FileBlockDevice`]) or an
 * in-memory buffer ([`MemBlockDevice`]) both work. The [`ops`] module
 * wraps a single process-wide [`Fs`] instance for callers that want the
 * classic `mount`/`create`/`read`/... free-function surface instead of
 * holding a handle themselves.
 */

mod descriptor;
mod device;
mod directory;
mod error;
mod fat;
mod fs;
pub mod ops;
mod superblock;

pub use descriptor::FS_OPEN_MAX_COUNT;
pub use device::{BlockDevice, FileBlockDevice, MemBlockDevice, BLOCK_SIZE};
pub use directory::{FS_FILENAME_LEN, FS_FILE_MAX_COUNT};
pub use error::{FsError, Result};
pub use fat::FAT_EOC;
pub use fs::{Fs, FsInfo};
pub use superblock::Superblock;
