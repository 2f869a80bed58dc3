use index_fixed::index_fixed;

use byteorder::{ByteOrder, LittleEndian};
use fmt_extra::AsciiStr;

use crate::device::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, Result};
use crate::fat::FAT_EOC;
use crate::superblock::Superblock;

pub const FS_FILENAME_LEN: usize = 16;
pub const FS_FILE_MAX_COUNT: usize = 128;
const ENTRY_SIZE: usize = 32;

/// One slot of the root directory. An empty slot has `filename[0] == 0`.
#[derive(Clone, Copy)]
pub struct DirEntry {
    pub filename: [u8; FS_FILENAME_LEN],
    pub size: u32,
    pub first_block: u16,
}

impl DirEntry {
    const EMPTY: DirEntry = DirEntry { filename: [0; FS_FILENAME_LEN], size: 0, first_block: FAT_EOC };

    pub fn is_empty(&self) -> bool {
        self.filename[0] == 0
    }

    /// The stored name up to its NUL terminator. Only meaningful when
    /// `!is_empty()`; non-`DirEntry::EMPTY` slots always hold valid UTF-8
    /// because `create` only accepts `&str` names.
    pub fn name(&self) -> &str {
        let nul = self.filename.iter().position(|&b| b == 0).unwrap_or(FS_FILENAME_LEN);
        std::str::from_utf8(&self.filename[..nul]).unwrap_or("")
    }

    fn unpack(raw: &[u8; ENTRY_SIZE]) -> Self {
        let filename: &[u8; FS_FILENAME_LEN] = index_fixed!(raw; 0, .. FS_FILENAME_LEN);
        DirEntry {
            filename: *filename,
            size: LittleEndian::read_u32(&raw[16..20]),
            first_block: LittleEndian::read_u16(&raw[20..22]),
        }
    }

    fn pack(&self, raw: &mut [u8; ENTRY_SIZE]) {
        for b in raw.iter_mut() {
            *b = 0;
        }
        raw[0..FS_FILENAME_LEN].copy_from_slice(&self.filename);
        LittleEndian::write_u32(&mut raw[16..20], self.size);
        LittleEndian::write_u16(&mut raw[20..22], self.first_block);
    }
}

impl std::fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirEntry")
            .field("filename", &AsciiStr(self.filename))
            .field("size", &self.size)
            .field("first_block", &self.first_block)
            .finish()
    }
}

/// The fixed, single-block, 128-entry flat namespace.
pub struct RootDirectory {
    entries: [DirEntry; FS_FILE_MAX_COUNT],
}

impl RootDirectory {
    pub fn load<D: BlockDevice>(device: &mut D, sb: &Superblock) -> Result<Self> {
        let mut raw = [0u8; BLOCK_SIZE];
        device.read_block(sb.root_dir_index as u32, &mut raw)?;

        let mut entries = [DirEntry::EMPTY; FS_FILE_MAX_COUNT];
        for (i, entry) in entries.iter_mut().enumerate() {
            let slice: &[u8; ENTRY_SIZE] = index_fixed!(&raw; i * ENTRY_SIZE, .. (i * ENTRY_SIZE + ENTRY_SIZE));
            *entry = DirEntry::unpack(slice);
        }
        Ok(RootDirectory { entries })
    }

    pub fn flush<D: BlockDevice>(&self, device: &mut D, sb: &Superblock) -> Result<()> {
        let mut raw = [0u8; BLOCK_SIZE];
        for (i, entry) in self.entries.iter().enumerate() {
            let mut packed = [0u8; ENTRY_SIZE];
            entry.pack(&mut packed);
            raw[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE].copy_from_slice(&packed);
        }
        device.write_block(sb.root_dir_index as u32, &raw)?;
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| !e.is_empty() && e.name() == name)
    }

    pub fn entry(&self, index: usize) -> &DirEntry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut DirEntry {
        &mut self.entries[index]
    }

    /// Validates and reserves the lowest-indexed empty slot for `name`.
    /// Does not allocate any data block — the entry starts empty.
    pub fn create(&mut self, name: &str) -> Result<usize> {
        let filename = validate_name(name)?;
        if self.lookup(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        let slot = self.entries.iter().position(|e| e.is_empty()).ok_or(FsError::RootFull)?;
        self.entries[slot] = DirEntry { filename, size: 0, first_block: FAT_EOC };
        Ok(slot)
    }

    /// Clears the entry at `index`, returning its prior contents so the
    /// caller can free the chain it headed.
    pub fn clear(&mut self, index: usize) -> DirEntry {
        std::mem::replace(&mut self.entries[index], DirEntry::EMPTY)
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, u32, u16)> {
        self.entries.iter().filter(|e| !e.is_empty()).map(|e| (e.name(), e.size, e.first_block))
    }

    pub fn free_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_empty()).count()
    }
}

/// `name` must be non-empty and fit (with its NUL terminator) in
/// `FS_FILENAME_LEN` bytes.
fn validate_name(name: &str) -> Result<[u8; FS_FILENAME_LEN]> {
    if name.is_empty() {
        return Err(FsError::InvalidName("name is empty"));
    }
    if name.as_bytes().len() >= FS_FILENAME_LEN {
        return Err(FsError::InvalidName("name is too long"));
    }
    if name.as_bytes().contains(&0) {
        return Err(FsError::InvalidName("name contains a NUL byte"));
    }
    let mut filename = [0u8; FS_FILENAME_LEN];
    filename[..name.len()].copy_from_slice(name.as_bytes());
    Ok(filename)
}
