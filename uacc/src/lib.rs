pub mod accessor;
pub mod error;
pub mod region;
pub mod sysfs;
pub mod udmabuf;
pub mod uio;

pub use accessor::{Accessor, Accessor16, Accessor32, Accessor64, Accessor8, Word};
pub use error::{AccessError, Result};
pub use region::{HeapRegion, MemRegion, MmapRegion};
pub use sysfs::SysPaths;
pub use udmabuf::{
    Udmabuf, UdmabufAccessor, UdmabufAccessor16, UdmabufAccessor32, UdmabufAccessor64,
    UdmabufAccessor8,
};
pub use uio::{Uio, UioInfo, UioMap};
