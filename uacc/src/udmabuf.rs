//! Contiguous DMA buffers exported by the udmabuf / u-dma-buf kernel
//! driver.
//!
//! The driver publishes each buffer as a character device `/dev/<name>`
//! and describes it under `/sys/class/udmabuf/<name>/` (`u-dma-buf` on
//! newer driver versions). The physical address is what gets programmed
//! into a DMA engine; the mapping is what the CPU reads and writes.

use crate::accessor::{Accessor, Word};
use crate::error::{AccessError, Result};
use crate::region::{MemRegion, MmapRegion};
use crate::sysfs::{read_auto_size_attr, read_hex_attr, SysPaths};
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

const CLASSES: [&str; 2] = ["udmabuf", "u-dma-buf"];

fn attr_path(paths: &SysPaths, name: &str, attr: &str) -> Result<PathBuf> {
    let dir = CLASSES
        .iter()
        .map(|class| paths.class_dir(class, name))
        .find(|d| d.is_dir())
        .ok_or_else(|| AccessError::NotFound {
            name: name.to_string(),
        })?;
    let path = dir.join(attr);
    if path.exists() {
        Ok(path)
    } else {
        Err(AccessError::MissingAttribute { path })
    }
}

pub fn phys_addr(paths: &SysPaths, name: &str) -> Result<u64> {
    read_hex_attr(&attr_path(paths, name, "phys_addr")?)
}

pub fn phys_size(paths: &SysPaths, name: &str) -> Result<usize> {
    read_auto_size_attr(&attr_path(paths, name, "size")?)
}

pub struct Udmabuf<D: Word = usize> {
    acc: Accessor<D>,
    region: Arc<MmapRegion>,
    paths: SysPaths,
    name: String,
    phys_addr: u64,
    size: usize,
}

pub type UdmabufAccessor = Udmabuf<usize>;
pub type UdmabufAccessor8 = Udmabuf<u8>;
pub type UdmabufAccessor16 = Udmabuf<u16>;
pub type UdmabufAccessor32 = Udmabuf<u32>;
pub type UdmabufAccessor64 = Udmabuf<u64>;

impl<D: Word> Udmabuf<D> {
    pub fn open(name: &str) -> Result<Self> {
        Self::open_in(&SysPaths::default(), name, 0)
    }

    pub fn open_at(name: &str, offset: usize) -> Result<Self> {
        Self::open_in(&SysPaths::default(), name, offset)
    }

    /// Reads `size` and `phys_addr` once, maps the whole buffer, and hands
    /// out an accessor starting `offset` bytes in.
    pub fn open_in(paths: &SysPaths, name: &str, offset: usize) -> Result<Self> {
        let size = phys_size(paths, name)?;
        if size == 0 {
            return Err(AccessError::ZeroSize {
                name: name.to_string(),
            });
        }
        let phys_addr = phys_addr(paths, name)?;

        let node = paths.dev_node(name);
        let region = match MmapRegion::open(&node, size, 0) {
            Ok(r) => Arc::new(r),
            Err(AccessError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(AccessError::NotFound {
                    name: node.display().to_string(),
                })
            }
            Err(e) => return Err(e),
        };
        let acc = Accessor::new(region.clone() as Arc<dyn MemRegion>, offset)?;
        info!("opened {}: phys 0x{:x}, 0x{:x} bytes", name, phys_addr, size);
        Ok(Udmabuf {
            acc,
            region,
            paths: paths.clone(),
            name: name.to_string(),
            phys_addr,
            size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Size of the whole buffer, independent of the accessor's offset.
    pub fn phys_size(&self) -> usize {
        self.size
    }

    pub fn region(&self) -> &Arc<MmapRegion> {
        &self.region
    }

    fn write_attr(&self, attr: &str, value: &str) -> Result<()> {
        let path = attr_path(&self.paths, &self.name, attr)?;
        debug!("{} <- {}", path.display(), value);
        let mut f = OpenOptions::new().write(true).open(path)?;
        f.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Restricts subsequent syncs to `size` bytes at `offset`.
    pub fn set_sync_area(&self, offset: usize, size: usize) -> Result<()> {
        self.write_attr("sync_offset", &offset.to_string())?;
        self.write_attr("sync_size", &size.to_string())
    }

    pub fn sync_for_cpu(&self) -> Result<()> {
        self.write_attr("sync_for_cpu", "1")
    }

    pub fn sync_for_device(&self) -> Result<()> {
        self.write_attr("sync_for_device", "1")
    }
}

impl<D: Word> Deref for Udmabuf<D> {
    type Target = Accessor<D>;

    fn deref(&self) -> &Self::Target {
        &self.acc
    }
}
