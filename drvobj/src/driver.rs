use crate::controller::{Controller, OpenMode};
use crate::error::DriverError;
use log::{debug, info, warn};
use std::io::SeekFrom;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct State<C> {
    controller: C,
    open_count: usize,
}

struct Inner<C> {
    state: Mutex<State<C>>,
    max_files: usize,
}

/// Shared handle to a controller and its open count. Clones refer to the
/// same driver.
pub struct Driver<C: Controller> {
    inner: Arc<Inner<C>>,
}

impl<C: Controller> Clone for Driver<C> {
    fn clone(&self) -> Self {
        Driver {
            inner: self.inner.clone(),
        }
    }
}

// What the descriptor table hands back before the open is committed.
struct FileDesc {
    path: String,
    mode: OpenMode,
}

impl<C: Controller> Driver<C> {
    pub fn new(controller: C) -> Self {
        Self::with_max_files(controller, usize::MAX)
    }

    pub fn with_max_files(controller: C, max_files: usize) -> Self {
        Driver {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    controller,
                    open_count: 0,
                }),
                max_files,
            }),
        }
    }

    // Poisoning is ignored: the count only ever changes in whole steps under
    // the lock, so a panic in a controller call cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, State<C>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn create_file(
        &self,
        state: &State<C>,
        path: &str,
        mode: OpenMode,
    ) -> Result<FileDesc, DriverError<C::Error>> {
        if mode.is_empty() {
            return Err(DriverError::InvalidMode);
        }
        if state.open_count >= self.inner.max_files {
            return Err(DriverError::TooManyFiles);
        }
        Ok(FileDesc {
            path: path.to_string(),
            mode,
        })
    }

    /// Opens a file on the driver. The lock is held from descriptor
    /// allocation through the count increment, so exactly one caller sees the
    /// count at zero and initializes the controller. A failed allocation or
    /// initialization leaves the count as it was.
    pub fn open(
        &self,
        path: &str,
        mode: OpenMode,
    ) -> Result<DriverFile<C>, DriverError<C::Error>> {
        let mut state = self.lock();

        let desc = self.create_file(&state, path, mode)?;

        if state.open_count == 0 {
            info!("first open ({}), initializing controller", path);
            if let Err(e) = state.controller.initialize() {
                warn!("controller initialization failed: {:?}", e);
                return Err(DriverError::Controller(e));
            }
        }
        state.open_count += 1;
        debug!("opened {} ({} open)", path, state.open_count);

        Ok(DriverFile {
            driver: self.clone(),
            path: desc.path,
            mode: desc.mode,
            position: 0,
        })
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    /// The controller is up exactly while at least one file is open.
    pub fn is_initialized(&self) -> bool {
        self.open_count() > 0
    }

    /// Runs `f` on the controller with the driver lock held.
    pub fn with_controller<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.lock().controller)
    }

    fn release_one(&self) {
        let mut state = self.lock();
        state.open_count -= 1;
        if state.open_count == 0 {
            info!("last file closed, releasing controller");
            state.controller.release();
        }
    }
}

/// One open of a [`Driver`]. Holds a reference on the driver until dropped.
pub struct DriverFile<C: Controller> {
    driver: Driver<C>,
    path: String,
    mode: OpenMode,
    position: u64,
}

impl<C: Controller> DriverFile<C> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn driver(&self) -> &Driver<C> {
        &self.driver
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, DriverError<C::Error>> {
        if !self.mode.contains(OpenMode::READ) {
            return Err(DriverError::NotReadable);
        }
        let n = self.driver.lock().controller.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<usize, DriverError<C::Error>> {
        if !self.mode.contains(OpenMode::WRITE) {
            return Err(DriverError::NotWritable);
        }
        let n = self.driver.lock().controller.write_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Positions are limited to `0..=capacity`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, DriverError<C::Error>> {
        let capacity = self.driver.lock().controller.capacity();
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
            SeekFrom::End(d) => capacity.checked_add_signed(d),
        };
        match target {
            Some(t) if t <= capacity => {
                self.position = t;
                Ok(t)
            }
            _ => Err(DriverError::InvalidSeek),
        }
    }

    pub fn close(self) {}
}

impl<C: Controller> Drop for DriverFile<C> {
    fn drop(&mut self) {
        debug!("closing {}", self.path);
        self.driver.release_one();
    }
}
