use std::fmt;
use std::ops::BitOr;

/// The hardware behind a driver. Every call happens with the driver lock
/// held, so implementations need no locking of their own.
pub trait Controller: Send {
    type Error: fmt::Debug;

    /// Brings the hardware up. Called by the open that takes the open count
    /// from zero.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Called by the close that takes the open count back to zero.
    fn release(&mut self) {}

    /// Addressable size in bytes.
    fn capacity(&self) -> u64;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode(u32);

impl OpenMode {
    pub const READ: OpenMode = OpenMode(0x01);
    pub const WRITE: OpenMode = OpenMode(0x02);
    pub const READ_WRITE: OpenMode = OpenMode(0x03);

    const ALL: u32 = 0x03;

    pub const fn empty() -> Self {
        OpenMode(0)
    }

    /// `None` for an empty set or bits outside `READ | WRITE`.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits != 0 && bits & !Self::ALL == 0 {
            Some(OpenMode(bits))
        } else {
            None
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: OpenMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for OpenMode {
    type Output = OpenMode;

    fn bitor(self, rhs: Self) -> Self::Output {
        OpenMode(self.0 | rhs.0)
    }
}
