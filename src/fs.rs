use crate::descriptor::FdTable;
use crate::device::{BlockDevice, BLOCK_SIZE};
use crate::directory::RootDirectory;
use crate::error::{FsError, Result};
use crate::fat::{Fat, FAT_EOC};
use crate::superblock::Superblock;

/// Geometry and occupancy snapshot returned by [`Fs::info`].
#[derive(Debug, Clone, Copy)]
pub struct FsInfo {
    pub total_blk_count: u16,
    pub fat_blk_count: u8,
    pub rdir_blk: u16,
    pub data_blk: u16,
    pub data_blk_count: u16,
    pub fat_free_count: usize,
    pub rdir_free_count: usize,
}

impl std::fmt::Display for FsInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total_blk_count={}", self.total_blk_count)?;
        writeln!(f, "fat_blk_count={}", self.fat_blk_count)?;
        writeln!(f, "rdir_blk={}", self.rdir_blk)?;
        writeln!(f, "data_blk={}", self.data_blk)?;
        writeln!(f, "data_blk_count={}", self.data_blk_count)?;
        writeln!(f, "fat_free_ratio={}/{}", self.fat_free_count, self.data_blk_count)?;
        write!(f, "rdir_free_ratio={}/{}", self.rdir_free_count, crate::directory::FS_FILE_MAX_COUNT)
    }
}

/// A mounted file system. Owns the block device and every in-memory mirror
/// of on-disk state (superblock, FAT, root directory, open-file table).
/// Constructed by [`Fs::mount`], destroyed by [`Fs::unmount`].
pub struct Fs<S: BlockDevice> {
    device: S,
    superblock: Superblock,
    fat: Fat,
    root_dir: RootDirectory,
    fd_table: FdTable,
}

impl<S: BlockDevice> Fs<S> {
    pub fn mount(mut device: S) -> Result<Self> {
        let superblock = Superblock::read_from(&mut device)?;
        let fat = Fat::load(&mut device, &superblock)?;
        let root_dir = RootDirectory::load(&mut device, &superblock)?;
        log::info!(
            "mounted: {} blocks, {} FAT block(s), {} data block(s)",
            superblock.total_disk_blocks,
            superblock.total_fat_blocks,
            superblock.data_blocks_count
        );
        Ok(Fs { device, superblock, fat, root_dir, fd_table: FdTable::new() })
    }

    /// Flushes FAT and root-directory metadata to the device and consumes
    /// `self`. Fails (without flushing anything) if any descriptor is still
    /// open.
    pub fn unmount(mut self) -> Result<()> {
        let open = self.fd_table.any_open();
        if open > 0 {
            return Err(FsError::Busy(String::from("<mounted file system>"), open));
        }
        self.fat.flush(&mut self.device, &self.superblock)?;
        self.root_dir.flush(&mut self.device, &self.superblock)?;
        log::info!("unmounted");
        Ok(())
    }

    pub fn info(&self) -> FsInfo {
        FsInfo {
            total_blk_count: self.superblock.total_disk_blocks,
            fat_blk_count: self.superblock.total_fat_blocks,
            rdir_blk: self.superblock.root_dir_index,
            data_blk: self.superblock.data_block_start_index,
            data_blk_count: self.superblock.data_blocks_count,
            fat_free_count: self.fat.free_count(),
            rdir_free_count: self.root_dir.free_count(),
        }
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        self.root_dir.create(name)?;
        log::debug!("created {name:?}");
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let idx = self.root_dir.lookup(name).ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let open = self.fd_table.count_open(name);
        if open > 0 {
            return Err(FsError::Busy(name.to_string(), open));
        }
        let entry = self.root_dir.clear(idx);
        self.fat.free_chain(entry.first_block);
        self.root_dir.flush(&mut self.device, &self.superblock)?;
        log::debug!("deleted {name:?}");
        Ok(())
    }

    pub fn ls(&self) -> Vec<(String, u32, u16)> {
        self.root_dir.list().map(|(name, size, block)| (name.to_string(), size, block)).collect()
    }

    pub fn open(&mut self, name: &str) -> Result<usize> {
        if self.root_dir.lookup(name).is_none() {
            return Err(FsError::NotFound(name.to_string()));
        }
        self.fd_table.open(name)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.fd_table.close(fd)
    }

    pub fn stat(&self, fd: usize) -> Result<u32> {
        let name = &self.fd_table.get(fd)?.filename;
        let idx = self.root_dir.lookup(name).ok_or_else(|| FsError::NotFound(name.clone()))?;
        Ok(self.root_dir.entry(idx).size)
    }

    pub fn lseek(&mut self, fd: usize, offset: u64) -> Result<()> {
        let size = self.stat(fd)? as u64;
        if offset > size {
            return Err(FsError::SeekOutOfRange { offset, size });
        }
        self.fd_table.get_mut(fd)?.offset = offset;
        Ok(())
    }

    /// Reads up to `dst.len()` bytes starting at the descriptor's current
    /// offset, returning the number of bytes actually copied. A short read
    /// at end-of-file is success, not an error.
    pub fn read(&mut self, fd: usize, dst: &mut [u8]) -> Result<usize> {
        let name = self.fd_table.get(fd)?.filename.clone();
        let idx = self.root_dir.lookup(&name).ok_or_else(|| FsError::NotFound(name.clone()))?;
        let entry = *self.root_dir.entry(idx);
        let off = self.fd_table.get(fd)?.offset;

        let to_read = (dst.len() as u64).min(entry.size as u64 - off);
        if to_read == 0 {
            return Ok(0);
        }
        let to_read = to_read as usize;

        let skip = (off / BLOCK_SIZE as u64) as usize;
        self.fat.chain_len(entry.first_block)?;
        let mut block = self.fat.walk_to_block(entry.first_block, skip);

        let mut bounce = [0u8; BLOCK_SIZE];
        let mut remaining = to_read;
        let mut src_off = off;
        let mut dst_cursor = 0usize;

        while remaining > 0 && block != FAT_EOC {
            self.device.read_block(self.superblock.data_block_start_index as u32 + block as u32, &mut bounce)?;
            let within = (src_off % BLOCK_SIZE as u64) as usize;
            let n = remaining.min(BLOCK_SIZE - within);
            dst[dst_cursor..dst_cursor + n].copy_from_slice(&bounce[within..within + n]);

            src_off += n as u64;
            dst_cursor += n;
            remaining -= n;
            block = self.fat.next(block);
        }

        let bytes_read = dst_cursor;
        self.fd_table.get_mut(fd)?.offset = off + bytes_read as u64;
        Ok(bytes_read)
    }

    /// Writes up to `src.len()` bytes at the descriptor's current offset,
    /// extending the file and allocating new blocks as needed. Returns the
    /// number of bytes actually written, which is less than `src.len()`
    /// only when the disk runs out of free blocks mid-write.
    pub fn write(&mut self, fd: usize, src: &[u8]) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }

        let name = self.fd_table.get(fd)?.filename.clone();
        let idx = self.root_dir.lookup(&name).ok_or_else(|| FsError::NotFound(name.clone()))?;
        let off = self.fd_table.get(fd)?.offset;

        let mut entry = *self.root_dir.entry(idx);
        if entry.first_block == FAT_EOC {
            let first = self.fat.allocate_free();
            if first == FAT_EOC {
                log::warn!("write to {name:?} failed: disk full");
                return Ok(0);
            }
            entry.first_block = first;
            *self.root_dir.entry_mut(idx) = entry;
        }

        let start_block_idx = (off / BLOCK_SIZE as u64) as usize;
        let mut block = walk_or_extend(&mut self.fat, entry.first_block, start_block_idx);
        if block == FAT_EOC {
            let bytes_written = 0;
            self.fd_table.get_mut(fd)?.offset = off + bytes_written as u64;
            return Ok(bytes_written);
        }

        let mut bounce = [0u8; BLOCK_SIZE];
        let mut remaining = src.len();
        let mut cur_off = off;
        let mut src_cursor = 0usize;

        loop {
            let within = (cur_off % BLOCK_SIZE as u64) as usize;
            let n = remaining.min(BLOCK_SIZE - within);
            let partial_block = within != 0 || n != BLOCK_SIZE;
            if partial_block {
                self.device
                    .read_block(self.superblock.data_block_start_index as u32 + block as u32, &mut bounce)?;
            }
            bounce[within..within + n].copy_from_slice(&src[src_cursor..src_cursor + n]);
            self.device.write_block(self.superblock.data_block_start_index as u32 + block as u32, &bounce)?;

            cur_off += n as u64;
            src_cursor += n;
            remaining -= n;

            if remaining == 0 {
                break;
            }

            let next = self.fat.next(block);
            block = if next == FAT_EOC { self.fat.extend(block) } else { next };
            if block == FAT_EOC {
                log::warn!("write to {name:?} truncated: disk full after {src_cursor} byte(s)");
                break;
            }
        }

        let bytes_written = src_cursor;
        self.fd_table.get_mut(fd)?.offset = cur_off;
        let entry = self.root_dir.entry_mut(idx);
        entry.size = entry.size.max(cur_off as u32);
        Ok(bytes_written)
    }
}

/// Walks the chain from `head` to the `target`-th block, extending it one
/// block at a time if `target` lies past the current end-of-chain. Returns
/// `FAT_EOC` if an extension fails partway (disk full).
fn walk_or_extend(fat: &mut Fat, head: u16, target: usize) -> u16 {
    let mut block = head;
    for _ in 0..target {
        let next = fat.next(block);
        block = if next == FAT_EOC { fat.extend(block) } else { next };
        if block == FAT_EOC {
            return FAT_EOC;
        }
    }
    block
}
