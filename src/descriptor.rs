use crate::error::{FsError, Result};

pub const FS_OPEN_MAX_COUNT: usize = 32;

/// One open-file session: a name (shared with the root entry it refers to)
/// and an independent byte offset.
pub struct OpenFile {
    pub filename: String,
    pub offset: u64,
}

/// The fixed 32-slot table of open descriptors. A file may be opened more
/// than once; each instance gets its own slot and offset but all instances
/// resolve to the same root entry by name.
pub struct FdTable {
    slots: [Option<OpenFile>; FS_OPEN_MAX_COUNT],
}

impl FdTable {
    pub fn new() -> Self {
        FdTable { slots: std::array::from_fn(|_| None) }
    }

    pub fn open(&mut self, name: &str) -> Result<usize> {
        let slot = self.slots.iter().position(|s| s.is_none()).ok_or(FsError::TooManyOpen)?;
        self.slots[slot] = Some(OpenFile { filename: name.to_string(), offset: 0 });
        Ok(slot)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        let slot = self.slots.get_mut(fd).ok_or(FsError::BadDescriptor(fd))?;
        if slot.is_none() {
            return Err(FsError::BadDescriptor(fd));
        }
        *slot = None;
        Ok(())
    }

    pub fn get(&self, fd: usize) -> Result<&OpenFile> {
        self.slots.get(fd).and_then(|s| s.as_ref()).ok_or(FsError::BadDescriptor(fd))
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut OpenFile> {
        self.slots.get_mut(fd).and_then(|s| s.as_mut()).ok_or(FsError::BadDescriptor(fd))
    }

    /// Number of descriptors currently referencing `name`, used by `delete`
    /// (busy check) and `unmount` (open-descriptor check).
    pub fn count_open(&self, name: &str) -> usize {
        self.slots.iter().flatten().filter(|f| f.filename == name).count()
    }

    pub fn any_open(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_assigns_lowest_free_slot() {
        let mut t = FdTable::new();
        assert_eq!(t.open("a").unwrap(), 0);
        assert_eq!(t.open("b").unwrap(), 1);
        t.close(0).unwrap();
        assert_eq!(t.open("c").unwrap(), 0);
    }

    #[test]
    fn open_same_file_twice_gets_independent_offsets() {
        let mut t = FdTable::new();
        let a = t.open("f").unwrap();
        let b = t.open("f").unwrap();
        assert_ne!(a, b);
        t.get_mut(a).unwrap().offset = 10;
        assert_eq!(t.get(b).unwrap().offset, 0);
        assert_eq!(t.count_open("f"), 2);
    }

    #[test]
    fn fails_at_32_open_descriptors() {
        let mut t = FdTable::new();
        for i in 0..FS_OPEN_MAX_COUNT {
            t.open(&format!("f{i}")).unwrap();
        }
        assert!(matches!(t.open("one-too-many"), Err(FsError::TooManyOpen)));
    }

    #[test]
    fn close_rejects_out_of_range_and_empty_slots() {
        let mut t = FdTable::new();
        assert!(matches!(t.close(FS_OPEN_MAX_COUNT), Err(FsError::BadDescriptor(_))));
        assert!(matches!(t.close(0), Err(FsError::BadDescriptor(_))));
        t.open("a").unwrap();
        t.close(0).unwrap();
        assert!(matches!(t.close(0), Err(FsError::BadDescriptor(_))));
    }
}
