//! Userspace I/O devices: register maps and interrupt delivery through
//! `/dev/uioN`.

use crate::accessor::{Accessor, Word};
use crate::error::{AccessError, Result};
use crate::region::{MemRegion, MmapRegion};
use crate::sysfs::{read_attr, read_hex_attr, read_hex_size_attr, SysPaths};
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UioMap {
    pub index: u32,
    pub addr: u64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UioInfo {
    pub index: u32,
    pub name: String,
    pub maps: Vec<UioMap>,
}

pub fn page_size() -> usize {
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz > 0 {
        sz as usize
    } else {
        4096
    }
}

fn uio_indices(paths: &SysPaths) -> Result<Vec<u32>> {
    let dir = paths.class_root.join("uio");
    let entries = match fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut indices = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(n) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.strip_prefix("uio"))
            .and_then(|s| s.parse().ok())
        {
            indices.push(n);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

fn uio_dir(paths: &SysPaths, index: u32) -> std::path::PathBuf {
    paths.class_dir("uio", &format!("uio{}", index))
}

/// Index of the first UIO device whose `name` attribute matches.
pub fn find_uio(paths: &SysPaths, name: &str) -> Result<Option<u32>> {
    for index in uio_indices(paths)? {
        if read_attr(&uio_dir(paths, index).join("name"))? == name {
            debug!("{} is uio{}", name, index);
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn read_map(paths: &SysPaths, index: u32, map: u32) -> Result<Option<UioMap>> {
    let dir = uio_dir(paths, index).join("maps").join(format!("map{}", map));
    if !dir.is_dir() {
        return Ok(None);
    }
    Ok(Some(UioMap {
        index: map,
        addr: read_hex_attr(&dir.join("addr"))?,
        size: read_hex_size_attr(&dir.join("size"))?,
    }))
}

pub fn list_uio(paths: &SysPaths) -> Result<Vec<UioInfo>> {
    let mut out = Vec::new();
    for index in uio_indices(paths)? {
        let name = read_attr(&uio_dir(paths, index).join("name"))?;
        let mut maps = Vec::new();
        while let Some(m) = read_map(paths, index, maps.len() as u32)? {
            maps.push(m);
        }
        out.push(UioInfo { index, name, maps });
    }
    Ok(out)
}

/// One mapped region of a UIO device plus the device handle used for
/// interrupts.
pub struct Uio<D: Word = usize> {
    acc: Accessor<D>,
    region: Arc<MmapRegion>,
    irq: File,
    index: u32,
}

impl<D: Word> Uio<D> {
    pub fn open(paths: &SysPaths, index: u32, size: usize) -> Result<Self> {
        Self::open_map(paths, index, 0, size)
    }

    /// UIO selects map `N` by mapping at offset `N * page_size`.
    pub fn open_map(paths: &SysPaths, index: u32, map: u32, size: usize) -> Result<Self> {
        let node = paths.dev_node(&format!("uio{}", index));
        let offset = map as u64 * page_size() as u64;
        let region = Arc::new(MmapRegion::open(&node, size, offset)?);
        let irq = OpenOptions::new().read(true).write(true).open(&node)?;
        let acc = Accessor::new(region.clone() as Arc<dyn MemRegion>, 0)?;
        Ok(Uio {
            acc,
            region,
            irq,
            index,
        })
    }

    pub fn open_by_name(paths: &SysPaths, name: &str) -> Result<Self> {
        let index = find_uio(paths, name)?.ok_or_else(|| AccessError::NotFound {
            name: name.to_string(),
        })?;
        let map = read_map(paths, index, 0)?.ok_or_else(|| AccessError::NotFound {
            name: format!("{}/map0", name),
        })?;
        Self::open(paths, index, map.size)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn region(&self) -> &Arc<MmapRegion> {
        &self.region
    }

    pub fn set_irq_enable(&self, enable: bool) -> Result<()> {
        let v: u32 = enable.into();
        (&self.irq).write_all(&v.to_ne_bytes())?;
        Ok(())
    }

    /// Blocks until the next interrupt and returns the total event count.
    pub fn wait_irq(&self) -> Result<u32> {
        let mut buf = [0u8; 4];
        (&self.irq).read_exact(&mut buf)?;
        Ok(u32::from_ne_bytes(buf))
    }
}

impl<D: Word> Deref for Uio<D> {
    type Target = Accessor<D>;

    fn deref(&self) -> &Self::Target {
        &self.acc
    }
}
