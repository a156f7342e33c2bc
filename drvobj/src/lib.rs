//! Device driver objects shared between many open files.
//!
//! A [`Driver`] owns one hardware controller behind a mutex. Every
//! [`DriverFile`] it hands out holds one reference on it; the controller is
//! brought up by the open that takes the count from zero and released by the
//! close that brings it back.

pub mod controller;
pub mod driver;
pub mod error;
pub mod ramcard;

pub use controller::{Controller, OpenMode};
pub use driver::{Driver, DriverFile};
pub use error::DriverError;
pub use ramcard::{RamCard, RamCardError};
