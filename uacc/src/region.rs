//! Backing memory that accessors read and write through.

use crate::error::{AccessError, Result};
use log::debug;
use memmap2::{MmapMut, MmapOptions};
use std::cell::UnsafeCell;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// A contiguous span of memory that stays valid for as long as the region is
/// alive. Accessors hold one of these behind an `Arc` and never look at what
/// provides it.
pub trait MemRegion: Send + Sync {
    fn as_ptr(&self) -> *mut u8;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shared mapping of a device node (or any mappable file).
pub struct MmapRegion {
    map: MmapMut,
    ptr: *mut u8,
    path: PathBuf,
    _file: File,
}

// Safety: the pointer is into `map`, which lives as long as the region, and
// every access through it is volatile.
unsafe impl Send for MmapRegion {}
unsafe impl Sync for MmapRegion {}

impl MmapRegion {
    pub fn open(path: impl AsRef<Path>, size: usize, offset: u64) -> Result<Self> {
        let path = path.as_ref();
        if size == 0 {
            return Err(AccessError::ZeroSize {
                name: path.display().to_string(),
            });
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut map = unsafe { MmapOptions::new().offset(offset).len(size).map_mut(&file)? };
        let ptr = map.as_mut_ptr();
        debug!(
            "mapped 0x{:x} bytes of {} at offset 0x{:x}",
            size,
            path.display(),
            offset
        );
        Ok(MmapRegion {
            map,
            ptr,
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

impl MemRegion for MmapRegion {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Zeroed process memory, aligned to eight bytes.
pub struct HeapRegion {
    words: Box<[UnsafeCell<u64>]>,
    len: usize,
}

// Safety: only reached through raw volatile accesses, same as a mapping.
unsafe impl Send for HeapRegion {}
unsafe impl Sync for HeapRegion {}

impl HeapRegion {
    pub fn new(len: usize) -> Self {
        let words = (0..len.div_ceil(8)).map(|_| UnsafeCell::new(0)).collect();
        HeapRegion { words, len }
    }
}

impl MemRegion for HeapRegion {
    fn as_ptr(&self) -> *mut u8 {
        // Derived from the whole slice so the pointer covers every word.
        UnsafeCell::raw_get(self.words.as_ptr()) as *mut u8
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn heap_region_is_aligned_and_zeroed() {
        let r = HeapRegion::new(13);
        assert_eq!(r.len(), 13);
        assert_eq!(r.as_ptr() as usize % 8, 0);
        for i in 0..13 {
            assert_eq!(unsafe { r.as_ptr().add(i).read_volatile() }, 0);
        }
        assert!(HeapRegion::new(0).is_empty());
    }

    #[test]
    fn heap_region_covers_every_word() {
        use crate::accessor::Accessor32;
        use std::sync::Arc;

        let acc = Accessor32::new(Arc::new(HeapRegion::new(64)), 0).unwrap();
        acc.write_mem(16, 0xdead_beef).unwrap();
        acc.write_reg(15, 0x0bad_f00d).unwrap();
        assert_eq!(acc.read_mem(16).unwrap(), 0xdead_beef);
        assert_eq!(acc.read_mem(60).unwrap(), 0x0bad_f00d);
        assert_eq!(acc.read_mem(8).unwrap(), 0);
    }

    #[test]
    fn mmap_region_sees_file_contents() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xa5; 4096]).unwrap();
        f.flush().unwrap();

        let r = MmapRegion::open(f.path(), 4096, 0).unwrap();
        assert_eq!(r.len(), 4096);
        assert_eq!(unsafe { r.as_ptr().add(100).read_volatile() }, 0xa5);
        assert_eq!(r.path(), f.path());
    }

    #[test]
    fn mmap_region_rejects_zero_size() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            MmapRegion::open(f.path(), 0, 0),
            Err(AccessError::ZeroSize { .. })
        ));
    }

    #[test]
    fn mmap_region_reports_missing_node() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MmapRegion::open(dir.path().join("nope"), 4096, 0),
            Err(AccessError::Io(_))
        ));
    }
}
