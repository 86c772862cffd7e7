//! Command-line configuration surface.
//!
//! Flag names and defaults match the exporter's historical interface, so
//! existing deployments keep working unchanged.

use clap::Parser;
use thiserror::Error;

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid i2c address '{0}'")]
    InvalidAddress(String),
}

/// Prometheus exporter for Bosch Sensortec BMP/BME environmental sensors.
#[derive(Debug, Clone, Parser)]
#[command(name = "bsb-exporter", version, about)]
pub struct Config {
    /// The I2C address of the sensor.
    #[arg(long = "i2caddress", value_name = "ADDR", default_value = "0x76")]
    pub i2c_address: String,

    /// The I2C bus ID.
    #[arg(long = "i2cbus", value_name = "BUS", default_value_t = 1)]
    pub i2c_bus: u8,

    /// The port on which to serve metrics.
    #[arg(short = 'p', long, default_value_t = 8000)]
    pub port: u16,

    /// The model of sensor.
    #[arg(long, default_value = "BME280")]
    pub model: String,

    /// Change logging level to verbose.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parses the configured I2C address.
    ///
    /// Accepts hex with a `0x` prefix (the conventional form reported by
    /// `i2cdetect`), bare hex, or decimal.
    pub fn parse_i2c_address(&self) -> Result<u8, ConfigError> {
        let raw = self.i2c_address.trim();
        let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            u8::from_str_radix(hex, 16)
        } else {
            raw.parse::<u8>()
                .or_else(|_| u8::from_str_radix(raw, 16))
        };
        parsed.map_err(|_| ConfigError::InvalidAddress(self.i2c_address.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_address(address: &str) -> Config {
        Config::parse_from(["bsb-exporter", "--i2caddress", address])
    }

    #[test]
    fn test_defaults_match_historical_interface() {
        let config = Config::parse_from(["bsb-exporter"]);
        assert_eq!(config.i2c_address, "0x76");
        assert_eq!(config.i2c_bus, 1);
        assert_eq!(config.port, 8000);
        assert_eq!(config.model, "BME280");
        assert!(!config.verbose);
    }

    #[test]
    fn test_address_parsing_accepts_hex_and_decimal() {
        assert_eq!(config_with_address("0x76").parse_i2c_address(), Ok(0x76));
        assert_eq!(config_with_address("0X77").parse_i2c_address(), Ok(0x77));
        assert_eq!(config_with_address("118").parse_i2c_address(), Ok(118));
        assert_eq!(config_with_address("76").parse_i2c_address(), Ok(76));
    }

    #[test]
    fn test_address_parsing_rejects_garbage() {
        assert!(config_with_address("bme").parse_i2c_address().is_err());
        assert!(config_with_address("0x").parse_i2c_address().is_err());
        assert!(config_with_address("0x1234").parse_i2c_address().is_err());
    }

    #[test]
    fn test_short_flags() {
        let config = Config::parse_from(["bsb-exporter", "-p", "9100", "-v"]);
        assert_eq!(config.port, 9100);
        assert!(config.verbose);
    }
}
