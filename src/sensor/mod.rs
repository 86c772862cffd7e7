//! Sensor access and identity resolution.
//!
//! This module provides the seam between the exporter and the hardware: a
//! [`Sensor`] trait with blocking read operations, a mock implementation for
//! testing, the identity resolver mapping signature bytes to model names,
//! and (behind the `hardware` feature) a real I2C-backed driver.

mod device;
mod identity;

#[cfg(feature = "hardware")]
mod i2c;

pub use device::{Accuracy, MockSensor, ReadCounters, Sensor, SensorError};
pub use identity::{resolve_name, IdentityError, SensorModel, UNKNOWN};

#[cfg(feature = "hardware")]
pub use i2c::I2cSensor;
