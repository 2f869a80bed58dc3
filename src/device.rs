//! The block device is the one component this crate treats as an external
//! collaborator: it owns nothing about file-system semantics, only
//! byte-exact fixed-size block I/O.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use io_at::{ReadAt, WriteAt};

pub const BLOCK_SIZE: usize = 4096;

/// A block-addressable store. The FAT manager, root-directory manager, and
/// I/O engine are all generic over this trait and never assume a concrete
/// backing store.
pub trait BlockDevice {
    /// Number of `BLOCK_SIZE`-byte blocks the device holds.
    fn block_count(&self) -> u32;

    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()>;

    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> io::Result<()>;
}

/// A `BlockDevice` backed by a regular file, addressed with positional I/O
/// so reads and writes don't disturb a shared file cursor.
pub struct FileBlockDevice {
    file: File,
    block_count: u32,
}

impl FileBlockDevice {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let block_count = (len / BLOCK_SIZE as u64) as u32;
        Ok(FileBlockDevice { file, block_count })
    }
}

impl BlockDevice for FileBlockDevice {
    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        if index >= self.block_count {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "block index out of range"));
        }
        read_at_exact(&self.file, buf, index as u64 * BLOCK_SIZE as u64)
    }

    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        if index >= self.block_count {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "block index out of range"));
        }
        write_at_exact(&self.file, buf, index as u64 * BLOCK_SIZE as u64)
    }
}

/// `io_at::ReadAt` only promises to read *some* of the requested bytes per
/// call, so a full block read loops until the buffer is filled or the
/// device reports EOF.
fn read_at_exact<R: ReadAt>(r: &R, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    while !buf.is_empty() {
        let n = r.read_at(buf, offset)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short block read"));
        }
        buf = &mut buf[n..];
        offset += n as u64;
    }
    Ok(())
}

fn write_at_exact<W: WriteAt>(w: &W, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    while !buf.is_empty() {
        let n = w.write_at(buf, offset)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "short block write"));
        }
        buf = &buf[n..];
        offset += n as u64;
    }
    Ok(())
}

/// An in-memory `BlockDevice`, used by tests and embeddable callers who
/// don't want a real file backing the mount.
pub struct MemBlockDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

impl MemBlockDevice {
    pub fn new(block_count: u32) -> Self {
        MemBlockDevice { blocks: vec![[0u8; BLOCK_SIZE]; block_count as usize] }
    }
}

impl BlockDevice for MemBlockDevice {
    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn read_block(&mut self, index: u32, buf: &mut [u8; BLOCK_SIZE]) -> io::Result<()> {
        let block = self.blocks.get(index as usize).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "block index out of range")
        })?;
        buf.copy_from_slice(block);
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &[u8; BLOCK_SIZE]) -> io::Result<()> {
        let block = self.blocks.get_mut(index as usize).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "block index out of range")
        })?;
        block.copy_from_slice(buf);
        Ok(())
    }
}
