//! Typed windows onto a [`MemRegion`].

use crate::error::{AccessError, Result};
use crate::region::MemRegion;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;

mod sealed {
    pub trait Sealed {}
}

/// An unsigned integer that can be moved across the bus in one access.
pub trait Word: sealed::Sealed + Copy + Default + fmt::Debug + Send + Sync + 'static {
    const BYTES: usize;
}

macro_rules! word {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}
            impl Word for $t {
                const BYTES: usize = size_of::<$t>();
            }
        )*
    };
}

word!(u8, u16, u32, u64, usize);

/// A window of `size` bytes starting `offset` bytes into a region. `D` is the
/// native data width: plain reads and writes move a `D`, and register
/// indices are scaled by its size.
pub struct Accessor<D: Word = usize> {
    region: Arc<dyn MemRegion>,
    offset: usize,
    size: usize,
    phantom: PhantomData<fn() -> D>,
}

pub type Accessor8 = Accessor<u8>;
pub type Accessor16 = Accessor<u16>;
pub type Accessor32 = Accessor<u32>;
pub type Accessor64 = Accessor<u64>;

impl<D: Word> Clone for Accessor<D> {
    fn clone(&self) -> Self {
        Accessor {
            region: self.region.clone(),
            offset: self.offset,
            size: self.size,
            phantom: PhantomData,
        }
    }
}

impl<D: Word> fmt::Debug for Accessor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("width", &D::BYTES)
            .finish()
    }
}

impl<D: Word> Accessor<D> {
    /// Everything from `offset` to the end of the region.
    pub fn new(region: Arc<dyn MemRegion>, offset: usize) -> Result<Self> {
        let len = region.len();
        if offset > len {
            return Err(AccessError::OutOfRange {
                offset,
                len: 0,
                size: len,
            });
        }
        Ok(Accessor {
            region,
            offset,
            size: len - offset,
            phantom: PhantomData,
        })
    }

    pub fn with_size(region: Arc<dyn MemRegion>, offset: usize, size: usize) -> Result<Self> {
        check_span(offset, size, region.len())?;
        Ok(Accessor {
            region,
            offset,
            size,
            phantom: PhantomData,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn region(&self) -> &Arc<dyn MemRegion> {
        &self.region
    }

    /// A narrower window sharing the same region; `offset` is relative to
    /// this accessor.
    pub fn sub(&self, offset: usize, size: usize) -> Result<Self> {
        check_span(offset, size, self.size)?;
        Ok(Accessor {
            region: self.region.clone(),
            offset: self.offset + offset,
            size,
            phantom: PhantomData,
        })
    }

    pub fn cast<D2: Word>(&self) -> Accessor<D2> {
        Accessor {
            region: self.region.clone(),
            offset: self.offset,
            size: self.size,
            phantom: PhantomData,
        }
    }

    fn ptr_for<T: Word>(&self, addr: usize) -> Result<*mut T> {
        check_span(addr, T::BYTES, self.size)?;
        let ptr = unsafe { self.region.as_ptr().add(self.offset + addr) };
        if (ptr as usize) % T::BYTES != 0 {
            return Err(AccessError::Misaligned {
                offset: addr,
                align: T::BYTES,
            });
        }
        Ok(ptr as *mut T)
    }

    pub fn write_mem_as<T: Word>(&self, addr: usize, data: T) -> Result<()> {
        let ptr = self.ptr_for::<T>(addr)?;
        unsafe { ptr.write_volatile(data) };
        Ok(())
    }

    pub fn read_mem_as<T: Word>(&self, addr: usize) -> Result<T> {
        let ptr = self.ptr_for::<T>(addr)?;
        Ok(unsafe { ptr.read_volatile() })
    }

    pub fn write_mem(&self, addr: usize, data: D) -> Result<()> {
        self.write_mem_as(addr, data)
    }

    pub fn read_mem(&self, addr: usize) -> Result<D> {
        self.read_mem_as(addr)
    }

    pub fn write_reg_as<T: Word>(&self, reg: usize, data: T) -> Result<()> {
        self.write_mem_as(reg_addr::<D>(reg)?, data)
    }

    pub fn read_reg_as<T: Word>(&self, reg: usize) -> Result<T> {
        self.read_mem_as(reg_addr::<D>(reg)?)
    }

    pub fn write_reg(&self, reg: usize, data: D) -> Result<()> {
        self.write_reg_as(reg, data)
    }

    pub fn read_reg(&self, reg: usize) -> Result<D> {
        self.read_reg_as(reg)
    }

    pub fn copy_to(&self, addr: usize, src: &[u8]) -> Result<()> {
        check_span(addr, src.len(), self.size)?;
        let base = unsafe { self.region.as_ptr().add(self.offset + addr) };
        for (i, b) in src.iter().enumerate() {
            unsafe { base.add(i).write_volatile(*b) };
        }
        Ok(())
    }

    pub fn copy_from(&self, addr: usize, dst: &mut [u8]) -> Result<()> {
        check_span(addr, dst.len(), self.size)?;
        let base = unsafe { self.region.as_ptr().add(self.offset + addr) };
        for (i, b) in dst.iter_mut().enumerate() {
            *b = unsafe { base.add(i).read_volatile() };
        }
        Ok(())
    }

    pub fn fill(&self, value: u8) {
        let base = unsafe { self.region.as_ptr().add(self.offset) };
        for i in 0..self.size {
            unsafe { base.add(i).write_volatile(value) };
        }
    }
}

fn reg_addr<D: Word>(reg: usize) -> Result<usize> {
    reg.checked_mul(D::BYTES).ok_or(AccessError::OutOfRange {
        offset: usize::MAX,
        len: D::BYTES,
        size: 0,
    })
}

fn check_span(offset: usize, len: usize, size: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(AccessError::OutOfRange { offset, len, size }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::HeapRegion;

    fn heap(len: usize) -> Arc<dyn MemRegion> {
        Arc::new(HeapRegion::new(len))
    }

    #[test]
    fn registers_scale_with_data_width() {
        let acc = Accessor32::new(heap(64), 0).unwrap();
        acc.write_reg(3, 0xdead_beef).unwrap();
        assert_eq!(acc.read_mem(12).unwrap(), 0xdead_beef);
        let b = 0xdead_beef_u32.to_ne_bytes();
        assert_eq!(
            acc.read_mem_as::<u16>(12).unwrap(),
            u16::from_ne_bytes([b[0], b[1]])
        );

        let acc64 = acc.cast::<u64>();
        acc64.write_reg_as::<u8>(1, 0x7f).unwrap();
        assert_eq!(acc.read_mem_as::<u8>(8).unwrap(), 0x7f);
    }

    #[test]
    fn windows_are_relative_and_bounded() {
        let region = heap(256);
        let acc = Accessor8::new(region.clone(), 16).unwrap();
        assert_eq!(acc.size(), 240);

        let sub = acc.sub(32, 16).unwrap();
        sub.write_mem(0, 0x11).unwrap();
        assert_eq!(acc.read_mem(32).unwrap(), 0x11);
        let whole = Accessor8::new(region, 0).unwrap();
        assert_eq!(whole.read_mem(48).unwrap(), 0x11);

        assert!(matches!(
            sub.read_mem(16),
            Err(AccessError::OutOfRange { offset: 16, len: 1, size: 16 })
        ));
        assert!(acc.sub(200, 64).is_err());
        assert!(Accessor8::new(heap(8), 9).is_err());
        assert_eq!(Accessor8::new(heap(8), 8).unwrap().size(), 0);
    }

    #[test]
    fn misaligned_access_is_refused() {
        let acc = Accessor32::new(heap(32), 0).unwrap();
        assert!(matches!(
            acc.write_mem(2, 1),
            Err(AccessError::Misaligned { offset: 2, align: 4 })
        ));
        let odd = Accessor16::new(heap(32), 1).unwrap();
        assert!(odd.read_mem_as::<u8>(0).is_ok());
        assert!(odd.read_mem(0).is_err());
    }

    #[test]
    fn bulk_copy_and_fill() {
        let acc = Accessor::<usize>::with_size(heap(64), 8, 32).unwrap();
        acc.fill(0xcc);
        acc.copy_to(4, b"udmabuf").unwrap();

        let mut out = [0u8; 12];
        acc.copy_from(2, &mut out).unwrap();
        assert_eq!(&out, b"\xcc\xccudmabuf\xcc\xcc\xcc");
        assert!(acc.copy_to(30, b"xyz").is_err());
    }

    #[test]
    fn register_index_overflow() {
        let acc = Accessor64::new(heap(8), 0).unwrap();
        assert!(acc.read_reg(usize::MAX).is_err());
    }
}
