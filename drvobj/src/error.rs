use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError<E> {
    InvalidMode,
    TooManyFiles,
    NotReadable,
    NotWritable,
    InvalidSeek,
    Controller(E),
}

impl<E> From<E> for DriverError<E> {
    fn from(value: E) -> Self {
        DriverError::Controller(value)
    }
}

impl<E: fmt::Display> fmt::Display for DriverError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode => write!(f, "open mode grants neither read nor write"),
            Self::TooManyFiles => write!(f, "driver has no free file descriptors"),
            Self::NotReadable => write!(f, "file was not opened for reading"),
            Self::NotWritable => write!(f, "file was not opened for writing"),
            Self::InvalidSeek => write!(f, "seek outside the device"),
            Self::Controller(e) => write!(f, "controller: {}", e),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for DriverError<E> {}
