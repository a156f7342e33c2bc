//! A controller backed by process memory, for bring-up without hardware.

use crate::controller::Controller;
use log::debug;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RamCardError {
    NotReady,
    InitFailed,
}

impl fmt::Display for RamCardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "card accessed before initialization"),
            Self::InitFailed => write!(f, "card did not respond to initialization"),
        }
    }
}

impl std::error::Error for RamCardError {}

#[derive(Debug, Default)]
pub struct RamCard {
    data: Vec<u8>,
    ready: bool,
    pub fail_init: bool,
    pub init_calls: usize,
    pub release_calls: usize,
}

impl RamCard {
    pub fn new(capacity: usize) -> Self {
        RamCard {
            data: vec![0; capacity],
            ..Default::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn span(&self, offset: u64, len: usize) -> Result<(usize, usize), RamCardError> {
        if !self.ready {
            return Err(RamCardError::NotReady);
        }
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.data.len());
        let end = start.saturating_add(len).min(self.data.len());
        Ok((start, end))
    }
}

impl Controller for RamCard {
    type Error = RamCardError;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.init_calls += 1;
        if self.fail_init {
            return Err(RamCardError::InitFailed);
        }
        debug!("ram card ready, {} bytes", self.data.len());
        self.ready = true;
        Ok(())
    }

    fn release(&mut self) {
        self.release_calls += 1;
        self.ready = false;
    }

    fn capacity(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let (start, end) = self.span(offset, buf.len())?;
        buf[..end - start].copy_from_slice(&self.data[start..end]);
        Ok(end - start)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<usize, Self::Error> {
        let (start, end) = self.span(offset, buf.len())?;
        self.data[start..end].copy_from_slice(&buf[..end - start]);
        Ok(end - start)
    }
}
