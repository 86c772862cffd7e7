//! Prometheus exposition: the collector and the scrape endpoint.
//!
//! # Metrics Exposed
//!
//! - `temperature` - Current temperature in celsius
//! - `humidity` - Current relative humidity in percent (BME280 only)
//! - `pressure` - Current atmospheric pressure in pascals (the help text
//!   says hPa; the discrepancy is inherited and documented, not fixed)
//!
//! Every sample carries a `host` label and a constant `sensor_type` label
//! with the model name resolved from the device signature.

mod collector;
mod server;

pub use collector::{ExporterError, SensorExporter};
pub use server::{ExporterServer, ExporterServerConfig, ServerError};
