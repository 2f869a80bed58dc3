//! Process-wide `mount`/`create`/`read`/... free-function surface.
//!
//! [`Fs`] itself never depends on static storage — every operation takes
//! `&mut self` — but the classic C-shaped API this crate descends from
//! passes no handle at all. This module is the compatibility shim `spec.md`
//! §9 calls out: a single [`Fs<FileBlockDevice>`] behind a mutex, with one
//! free function per surface operation that locks it and forwards.

use std::sync::Mutex;

use crate::device::FileBlockDevice;
use crate::error::{FsError, Result};
use crate::fs::{Fs, FsInfo};

static MOUNTED: Mutex<Option<Fs<FileBlockDevice>>> = Mutex::new(None);

/// Opens `disk` and mounts it as the process-wide file system. Fails if a
/// disk is already mounted.
pub fn mount(disk: &str) -> Result<()> {
    let mut slot = MOUNTED.lock().unwrap();
    if slot.is_some() {
        return Err(FsError::AlreadyMounted);
    }
    let device = FileBlockDevice::open(disk)?;
    *slot = Some(Fs::mount(device)?);
    Ok(())
}

/// Flushes and unmounts the process-wide file system.
pub fn umount() -> Result<()> {
    let mut slot = MOUNTED.lock().unwrap();
    let fs = slot.take().ok_or(FsError::NotMounted)?;
    fs.unmount()
}

/// Geometry and occupancy of the mounted disk, matching `spec.md`'s
/// `fs_info` output (free/total integer ratios, never a percentage).
pub fn info() -> Result<FsInfo> {
    with_mounted(|fs| Ok(fs.info()))
}

pub fn create(name: &str) -> Result<()> {
    with_mounted(|fs| fs.create(name))
}

pub fn delete(name: &str) -> Result<()> {
    with_mounted(|fs| fs.delete(name))
}

pub fn ls() -> Result<Vec<(String, u32, u16)>> {
    with_mounted(|fs| Ok(fs.ls()))
}

pub fn open(name: &str) -> Result<usize> {
    with_mounted(|fs| fs.open(name))
}

pub fn close(fd: usize) -> Result<()> {
    with_mounted(|fs| fs.close(fd))
}

pub fn stat(fd: usize) -> Result<u32> {
    with_mounted(|fs| fs.stat(fd))
}

pub fn lseek(fd: usize, offset: u64) -> Result<()> {
    with_mounted(|fs| fs.lseek(fd, offset))
}

pub fn read(fd: usize, buf: &mut [u8]) -> Result<usize> {
    with_mounted(|fs| fs.read(fd, buf))
}

pub fn write(fd: usize, buf: &[u8]) -> Result<usize> {
    with_mounted(|fs| fs.write(fd, buf))
}

fn with_mounted<T>(f: impl FnOnce(&mut Fs<FileBlockDevice>) -> Result<T>) -> Result<T> {
    let mut slot = MOUNTED.lock().unwrap();
    let fs = slot.as_mut().ok_or(FsError::NotMounted)?;
    f(fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BLOCK_SIZE;
    use std::io::Write as _;

    // `ops` serializes a single process-wide disk, so its tests share one
    // mutex and must not run concurrently against independent disks; each
    // test mounts, exercises, and unmounts before returning.
    fn with_formatted_disk<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
        let sb = {
            let total_disk_blocks: u16 = 8200;
            let fat_blocks = 1u8;
            let root_dir_index = 1 + fat_blocks as u16;
            let data_block_start_index = root_dir_index + 1;
            let data_blocks_count = total_disk_blocks - data_block_start_index;
            crate::superblock::Superblock {
                total_disk_blocks,
                root_dir_index,
                data_block_start_index,
                data_blocks_count,
                total_fat_blocks: fat_blocks,
            }
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut raw = [0u8; BLOCK_SIZE];
        sb.pack(&mut raw);
        file.write_all(&raw).unwrap();

        let mut fat_raw = [0u8; BLOCK_SIZE];
        fat_raw[0] = 0xff;
        fat_raw[1] = 0xff;
        file.write_all(&fat_raw).unwrap();

        file.write_all(&[0u8; BLOCK_SIZE]).unwrap();
        for _ in 0..sb.data_blocks_count {
            file.write_all(&[0u8; BLOCK_SIZE]).unwrap();
        }
        file.flush().unwrap();

        f(file.path())
    }

    // All three scenarios below share the single process-wide `MOUNTED`
    // slot, so they run as one test rather than risk interleaving under the
    // test harness's default parallelism.
    #[test]
    fn mount_lifecycle_round_trip() {
        with_formatted_disk(|path| {
            let path = path.to_str().unwrap();

            assert!(matches!(create("x"), Err(FsError::NotMounted)));
            assert!(matches!(info(), Err(FsError::NotMounted)));

            mount(path).unwrap();
            assert!(matches!(mount(path), Err(FsError::AlreadyMounted)));

            create("hello").unwrap();
            let fd = open("hello").unwrap();
            assert_eq!(write(fd, b"hi").unwrap(), 2);
            lseek(fd, 0).unwrap();
            let mut buf = [0u8; 2];
            assert_eq!(read(fd, &mut buf).unwrap(), 2);
            assert_eq!(&buf, b"hi");
            close(fd).unwrap();
            umount().unwrap();

            assert!(matches!(info(), Err(FsError::NotMounted)));
        });
    }
}
