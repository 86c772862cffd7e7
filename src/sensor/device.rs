//! Sensor abstraction over the BMP/BME device family.
//!
//! This module provides a trait-based abstraction over the sensor hardware,
//! allowing for both a real I2C-backed implementation and a mock
//! implementation for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during sensor operations.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("i2c bus error: {0}")]
    Bus(String),
    #[error("failed to read measurement: {0}")]
    ReadFailed(String),
    #[error("calibration coefficients are invalid")]
    InvalidCoefficients,
    #[error("model {0} is not supported by the built-in driver")]
    UnsupportedModel(String),
}

/// Oversampling profile for a measurement.
///
/// Higher profiles trade measurement time for resolution. The exporter
/// always reads at [`Accuracy::High`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    /// 1x oversampling.
    UltraLow,
    /// 2x oversampling.
    Low,
    /// 4x oversampling.
    Standard,
    /// 8x oversampling.
    High,
    /// 16x oversampling.
    UltraHigh,
}

impl Accuracy {
    /// Returns the oversampling register value for this profile.
    pub fn oversampling(self) -> u8 {
        match self {
            Accuracy::UltraLow => 1,
            Accuracy::Low => 2,
            Accuracy::Standard => 3,
            Accuracy::High => 4,
            Accuracy::UltraHigh => 5,
        }
    }
}

/// Trait for sensor implementations.
///
/// This abstraction allows swapping between real sensor hardware and mock
/// implementations for testing. Every read is a fresh bus transaction; the
/// device holds no state between calls.
pub trait Sensor {
    /// Reads the current temperature in degrees celsius.
    fn read_temperature_c(&mut self, accuracy: Accuracy) -> Result<f64, SensorError>;

    /// Reads the current atmospheric pressure in pascals.
    fn read_pressure_pa(&mut self, accuracy: Accuracy) -> Result<f64, SensorError>;

    /// Reads the current relative humidity in percent.
    ///
    /// Returns `Ok(None)` when the sensor model has no humidity channel;
    /// that is an expected condition, not an error.
    fn read_humidity_rh(&mut self, accuracy: Accuracy) -> Result<Option<f64>, SensorError>;

    /// Reads the device signature byte (chip id register).
    fn read_signature(&mut self) -> Result<u8, SensorError>;

    /// Checks that the on-device calibration coefficients are plausible.
    fn validate_coefficients(&mut self) -> Result<(), SensorError>;
}

/// Shared read counters for [`MockSensor`], cloneable so tests can keep a
/// handle after the sensor moves into an exporter.
#[derive(Debug, Default, Clone)]
pub struct ReadCounters {
    temperature: Arc<AtomicUsize>,
    pressure: Arc<AtomicUsize>,
    humidity: Arc<AtomicUsize>,
}

impl ReadCounters {
    /// Number of temperature reads performed.
    pub fn temperature(&self) -> usize {
        self.temperature.load(Ordering::SeqCst)
    }

    /// Number of pressure reads performed.
    pub fn pressure(&self) -> usize {
        self.pressure.load(Ordering::SeqCst)
    }

    /// Number of humidity reads attempted (including on models without a
    /// humidity channel).
    pub fn humidity(&self) -> usize {
        self.humidity.load(Ordering::SeqCst)
    }
}

/// Mock sensor with scripted readings and per-metric failure injection.
#[derive(Debug)]
pub struct MockSensor {
    temperature_c: f64,
    pressure_pa: f64,
    humidity_rh: Option<f64>,
    signature: u8,
    temperature_fails: bool,
    pressure_fails: bool,
    humidity_fails: bool,
    signature_fails: bool,
    coefficients_invalid: bool,
    counters: ReadCounters,
}

impl Default for MockSensor {
    fn default() -> Self {
        // Plausible BME280 indoor readings.
        Self {
            temperature_c: 21.5,
            pressure_pa: 101_325.0,
            humidity_rh: Some(40.0),
            signature: 0x60,
            temperature_fails: false,
            pressure_fails: false,
            humidity_fails: false,
            signature_fails: false,
            coefficients_invalid: false,
            counters: ReadCounters::default(),
        }
    }
}

impl MockSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scripted readings returned by each channel.
    pub fn with_readings(mut self, temperature_c: f64, pressure_pa: f64, humidity_rh: f64) -> Self {
        self.temperature_c = temperature_c;
        self.pressure_pa = pressure_pa;
        self.humidity_rh = Some(humidity_rh);
        self
    }

    /// Sets the signature byte returned by [`Sensor::read_signature`].
    pub fn with_signature(mut self, signature: u8) -> Self {
        self.signature = signature;
        self
    }

    /// Removes the humidity channel, as on BMP-series models.
    pub fn without_humidity(mut self) -> Self {
        self.humidity_rh = None;
        self
    }

    /// Makes temperature reads fail.
    pub fn failing_temperature(mut self) -> Self {
        self.temperature_fails = true;
        self
    }

    /// Makes pressure reads fail.
    pub fn failing_pressure(mut self) -> Self {
        self.pressure_fails = true;
        self
    }

    /// Makes humidity reads fail.
    pub fn failing_humidity(mut self) -> Self {
        self.humidity_fails = true;
        self
    }

    /// Makes signature reads fail.
    pub fn failing_signature(mut self) -> Self {
        self.signature_fails = true;
        self
    }

    /// Makes coefficient validation fail.
    pub fn with_invalid_coefficients(mut self) -> Self {
        self.coefficients_invalid = true;
        self
    }

    /// Returns a handle to the read counters.
    pub fn counters(&self) -> ReadCounters {
        self.counters.clone()
    }
}

impl Sensor for MockSensor {
    fn read_temperature_c(&mut self, _accuracy: Accuracy) -> Result<f64, SensorError> {
        self.counters.temperature.fetch_add(1, Ordering::SeqCst);
        if self.temperature_fails {
            return Err(SensorError::ReadFailed("injected temperature failure".into()));
        }
        Ok(self.temperature_c)
    }

    fn read_pressure_pa(&mut self, _accuracy: Accuracy) -> Result<f64, SensorError> {
        self.counters.pressure.fetch_add(1, Ordering::SeqCst);
        if self.pressure_fails {
            return Err(SensorError::ReadFailed("injected pressure failure".into()));
        }
        Ok(self.pressure_pa)
    }

    fn read_humidity_rh(&mut self, _accuracy: Accuracy) -> Result<Option<f64>, SensorError> {
        self.counters.humidity.fetch_add(1, Ordering::SeqCst);
        match self.humidity_rh {
            None => Ok(None),
            Some(_) if self.humidity_fails => {
                Err(SensorError::ReadFailed("injected humidity failure".into()))
            }
            Some(h) => Ok(Some(h)),
        }
    }

    fn read_signature(&mut self) -> Result<u8, SensorError> {
        if self.signature_fails {
            return Err(SensorError::Bus("injected signature failure".into()));
        }
        Ok(self.signature)
    }

    fn validate_coefficients(&mut self) -> Result<(), SensorError> {
        if self.coefficients_invalid {
            return Err(SensorError::InvalidCoefficients);
        }
        Ok(())
    }
}
