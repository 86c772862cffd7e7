//! Bosch Sensortec environmental sensor exporter.
//!
//! Exposes temperature, pressure and relative humidity readings from one
//! BMP/BME-family sensor as Prometheus gauges. One device per process; the
//! sensor is read fresh on every scrape, and a failed read on one metric
//! never fails the scrape as a whole.
//!
//! # Architecture
//!
//! ```text
//! scraper → HTTP endpoint → registry.gather() → SensorExporter::collect()
//!                                                     ↓
//!                                             Sensor (I2C bus)
//! ```
//!
//! # Design Principles
//!
//! - **Best-effort scrapes**: each metric read is isolated; a failure costs
//!   one sample, not the scrape
//! - **No caching**: every scrape is a fresh hardware read pass
//! - **Fail-fast startup**: misconfiguration and absent hardware terminate
//!   the process before the endpoint is reachable
//!
//! # Example
//!
//! ```
//! use bsb_exporter::exporter::SensorExporter;
//! use bsb_exporter::sensor::MockSensor;
//! use prometheus::Registry;
//!
//! let sensor = MockSensor::new().with_readings(21.5, 101_325.0, 40.0);
//! let exporter = SensorExporter::new(sensor, "example-host").unwrap();
//!
//! let registry = Registry::new();
//! registry.register(Box::new(exporter)).unwrap();
//!
//! // Each gather runs one read pass over the sensor.
//! let families = registry.gather();
//! assert_eq!(families.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod exporter;
pub mod sensor;

// Re-export commonly used types at crate root
pub use config::Config;
pub use exporter::{ExporterServer, ExporterServerConfig, SensorExporter};
pub use sensor::{Accuracy, MockSensor, Sensor, SensorError, SensorModel};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
