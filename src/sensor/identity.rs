//! Sensor identity resolution.
//!
//! Two independent lookups: signature byte to model name (for labeling,
//! never fails) and configured model name to [`SensorModel`] (for driver
//! construction, fails loudly on misconfiguration).

use thiserror::Error;

/// Sentinel model name for unrecognized or unreadable signatures.
pub const UNKNOWN: &str = "unknown";

/// Errors from model name resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("unknown sensor type {0}")]
    InvalidModel(String),
}

/// The supported Bosch Sensortec sensor models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorModel {
    /// BMP180, signature 0x55. Temperature and pressure only.
    Bmp180,
    /// BMP280, signature 0x58. Temperature and pressure only.
    Bmp280,
    /// BME280, signature 0x60. Adds a humidity channel.
    Bme280,
    /// BMP388, signature 0x50. Temperature and pressure only.
    Bmp388,
}

/// Returns the canonical model name for a device signature byte.
///
/// Any unrecognized byte maps to [`UNKNOWN`]; callers that could not read
/// the signature at all use the same sentinel, so "read failed" and "not
/// recognized" are indistinguishable in the label. The name strings predate
/// this implementation and two of them ("BME180", "BME388") do not match
/// Bosch's part numbers; they are kept as-is for config compatibility.
pub fn resolve_name(signature: u8) -> &'static str {
    match signature {
        0x55 => "BME180",
        0x58 => "BMP280",
        0x60 => "BME280",
        0x50 => "BME388",
        _ => UNKNOWN,
    }
}

impl SensorModel {
    /// Resolves a configured model name to a sensor model.
    ///
    /// Total inverse of [`resolve_name`] over the four known names; any
    /// other input is an [`IdentityError::InvalidModel`], which is fatal at
    /// startup since the driver cannot be constructed without it.
    pub fn from_name(name: &str) -> Result<Self, IdentityError> {
        match name {
            "BME180" => Ok(SensorModel::Bmp180),
            "BMP280" => Ok(SensorModel::Bmp280),
            "BME280" => Ok(SensorModel::Bme280),
            "BME388" => Ok(SensorModel::Bmp388),
            other => Err(IdentityError::InvalidModel(other.to_string())),
        }
    }

    /// Returns the canonical name for this model.
    pub fn name(self) -> &'static str {
        match self {
            SensorModel::Bmp180 => "BME180",
            SensorModel::Bmp280 => "BMP280",
            SensorModel::Bme280 => "BME280",
            SensorModel::Bmp388 => "BME388",
        }
    }

    /// Returns the expected signature byte for this model.
    pub fn signature(self) -> u8 {
        match self {
            SensorModel::Bmp180 => 0x55,
            SensorModel::Bmp280 => 0x58,
            SensorModel::Bme280 => 0x60,
            SensorModel::Bmp388 => 0x50,
        }
    }

    /// Whether this model has a relative humidity channel.
    pub fn has_humidity(self) -> bool {
        matches!(self, SensorModel::Bme280)
    }
}

impl std::str::FromStr for SensorModel {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorModel::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KNOWN: [(u8, &str); 4] = [
        (0x55, "BME180"),
        (0x58, "BMP280"),
        (0x60, "BME280"),
        (0x50, "BME388"),
    ];

    #[test]
    fn test_resolve_name_known_signatures() {
        for (signature, name) in KNOWN {
            assert_eq!(resolve_name(signature), name);
        }
    }

    #[test]
    fn test_from_name_round_trips() {
        for (signature, name) in KNOWN {
            let model = SensorModel::from_name(name).unwrap();
            assert_eq!(model.name(), name);
            assert_eq!(model.signature(), signature);
        }
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        let err = SensorModel::from_name("DHT22").unwrap_err();
        assert_eq!(err, IdentityError::InvalidModel("DHT22".to_string()));
        assert!(SensorModel::from_name("bme280").is_err());
        assert!(SensorModel::from_name("").is_err());
    }

    #[test]
    fn test_only_bme280_has_humidity() {
        assert!(SensorModel::Bme280.has_humidity());
        assert!(!SensorModel::Bmp180.has_humidity());
        assert!(!SensorModel::Bmp280.has_humidity());
        assert!(!SensorModel::Bmp388.has_humidity());
    }

    proptest! {
        #[test]
        fn test_resolve_name_unrecognized_is_unknown(signature in any::<u8>()) {
            prop_assume!(!KNOWN.iter().any(|(s, _)| *s == signature));
            prop_assert_eq!(resolve_name(signature), UNKNOWN);
        }
    }
}
