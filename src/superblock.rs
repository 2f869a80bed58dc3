use byteorder::{ByteOrder, LittleEndian};
use index_fixed::index_fixed;

use crate::device::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, Result};

pub const SIGNATURE: &[u8; 8] = b"ECS150FS";

/// The single header block defining disk geometry. Cached in memory at
/// mount and never mutated afterward — geometry does not change while a
/// disk is mounted.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub total_disk_blocks: u16,
    pub root_dir_index: u16,
    pub data_block_start_index: u16,
    pub data_blocks_count: u16,
    pub total_fat_blocks: u8,
}

impl Superblock {
    pub fn unpack(raw: &[u8; BLOCK_SIZE]) -> Result<Self> {
        let signature: &[u8; 8] = index_fixed!(raw; 0, .. 8);
        if signature != SIGNATURE {
            return Err(FsError::BadSignature);
        }

        let sb = Superblock {
            total_disk_blocks: LittleEndian::read_u16(&raw[8..10]),
            root_dir_index: LittleEndian::read_u16(&raw[10..12]),
            data_block_start_index: LittleEndian::read_u16(&raw[12..14]),
            data_blocks_count: LittleEndian::read_u16(&raw[14..16]),
            total_fat_blocks: raw[16],
        };

        if Some(sb.root_dir_index) != 1u16.checked_add(sb.total_fat_blocks as u16) {
            return Err(FsError::BadGeometry("root_dir_index != 1 + total_FAT_blocks"));
        }
        if Some(sb.data_block_start_index) != sb.root_dir_index.checked_add(1) {
            return Err(FsError::BadGeometry("data_block_start_index != root_dir_index + 1"));
        }
        if sb.total_disk_blocks.checked_sub(sb.data_block_start_index) != Some(sb.data_blocks_count)
        {
            return Err(FsError::BadGeometry(
                "data_blocks_count != total_disk_blocks - data_block_start_index",
            ));
        }
        let expected_fat_blocks = div_ceil(sb.data_blocks_count as usize * 2, BLOCK_SIZE) as u8;
        if sb.total_fat_blocks != expected_fat_blocks {
            return Err(FsError::BadGeometry("total_FAT_blocks does not cover data_blocks_count"));
        }

        Ok(sb)
    }

    pub fn pack(&self, raw: &mut [u8; BLOCK_SIZE]) {
        for b in raw.iter_mut() {
            *b = 0;
        }
        raw[0..8].copy_from_slice(SIGNATURE);
        LittleEndian::write_u16(&mut raw[8..10], self.total_disk_blocks);
        LittleEndian::write_u16(&mut raw[10..12], self.root_dir_index);
        LittleEndian::write_u16(&mut raw[12..14], self.data_block_start_index);
        LittleEndian::write_u16(&mut raw[14..16], self.data_blocks_count);
        raw[16] = self.total_fat_blocks;
    }

    /// Reads and validates block 0 of `device` against the device's own
    /// reported block count, per the superblock manager's mount contract.
    pub fn read_from<D: BlockDevice>(device: &mut D) -> Result<Self> {
        let mut raw = [0u8; BLOCK_SIZE];
        device.read_block(0, &mut raw)?;
        let sb = Self::unpack(&raw)?;
        if sb.total_disk_blocks as u32 != device.block_count() {
            return Err(FsError::BadGeometry("total_disk_blocks does not match the block device"));
        }
        Ok(sb)
    }
}

fn div_ceil(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry_for(total_disk_blocks: u16) -> Superblock {
        let mut fat_blocks = 1u8;
        loop {
            let root_dir_index = 1 + fat_blocks as u16;
            let data_block_start_index = root_dir_index + 1;
            let data_blocks_count = total_disk_blocks - data_block_start_index;
            let needed = div_ceil(data_blocks_count as usize * 2, BLOCK_SIZE) as u8;
            if needed == fat_blocks {
                return Superblock {
                    total_disk_blocks,
                    root_dir_index,
                    data_block_start_index,
                    data_blocks_count,
                    total_fat_blocks: fat_blocks,
                };
            }
            fat_blocks = needed;
        }
    }

    #[test]
    fn pack_unpack_round_trips() {
        let sb = geometry_for(8200);
        // ceil(8193*2/4096) == 5, the fixpoint of the F(data_blocks_count)
        // relation for an 8200-block disk — not the F=1 in spec.md's
        // (internally inconsistent) §8.1 example.
        assert_eq!(sb.total_fat_blocks, 5);
        assert_eq!(sb.data_blocks_count, 8193);
        let mut raw = [0u8; BLOCK_SIZE];
        sb.pack(&mut raw);
        let back = Superblock::unpack(&raw).unwrap();
        assert_eq!(back.total_disk_blocks, sb.total_disk_blocks);
        assert_eq!(back.root_dir_index, sb.root_dir_index);
        assert_eq!(back.data_block_start_index, sb.data_block_start_index);
        assert_eq!(back.data_blocks_count, sb.data_blocks_count);
        assert_eq!(back.total_fat_blocks, sb.total_fat_blocks);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut raw = [0u8; BLOCK_SIZE];
        raw[0..8].copy_from_slice(b"NOTAFS!!");
        assert!(matches!(Superblock::unpack(&raw), Err(FsError::BadSignature)));
    }

    #[test]
    fn rejects_inconsistent_geometry() {
        let sb = geometry_for(8200);
        let mut raw = [0u8; BLOCK_SIZE];
        sb.pack(&mut raw);
        LittleEndian::write_u16(&mut raw[10..12], sb.root_dir_index + 1);
        assert!(matches!(Superblock::unpack(&raw), Err(FsError::BadGeometry(_))));
    }

    /// A `data_block_start_index` exceeding `total_disk_blocks` must fail
    /// cleanly as corruption, not underflow the `u16` subtraction that
    /// derives `data_blocks_count`.
    #[test]
    fn rejects_data_block_start_index_past_total_disk_blocks() {
        let mut raw = [0u8; BLOCK_SIZE];
        raw[0..8].copy_from_slice(SIGNATURE);
        LittleEndian::write_u16(&mut raw[8..10], 10); // total_disk_blocks
        LittleEndian::write_u16(&mut raw[10..12], 254); // root_dir_index
        LittleEndian::write_u16(&mut raw[12..14], 255); // data_block_start_index
        LittleEndian::write_u16(&mut raw[14..16], 0); // data_blocks_count
        raw[16] = 253; // total_fat_blocks, so root_dir_index == 1 + total_fat_blocks
        assert!(matches!(Superblock::unpack(&raw), Err(FsError::BadGeometry(_))));
    }
}
