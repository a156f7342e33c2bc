use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum AccessError {
    Io(io::Error),
    Parse { path: PathBuf, contents: String },
    ZeroSize { name: String },
    NotFound { name: String },
    MissingAttribute { path: PathBuf },
    OutOfRange { offset: usize, len: usize, size: usize },
    Misaligned { offset: usize, align: usize },
}

impl From<io::Error> for AccessError {
    fn from(value: io::Error) -> Self {
        AccessError::Io(value)
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::Parse { path, contents } => {
                write!(f, "could not parse {:?} from {}", contents, path.display())
            }
            Self::ZeroSize { name } => write!(f, "{} reports a size of zero", name),
            Self::NotFound { name } => write!(f, "no device named {}", name),
            Self::MissingAttribute { path } => {
                write!(f, "driver does not provide {}", path.display())
            }
            Self::OutOfRange { offset, len, size } => write!(
                f,
                "access of {} bytes at 0x{:x} exceeds window of 0x{:x} bytes",
                len, offset, size
            ),
            Self::Misaligned { offset, align } => {
                write!(f, "address 0x{:x} is not {}-byte aligned", offset, align)
            }
        }
    }
}

impl std::error::Error for AccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
