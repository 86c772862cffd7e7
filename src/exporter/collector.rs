//! The scrape-time collector.
//!
//! [`SensorExporter`] implements [`prometheus::core::Collector`]: on every
//! scrape it performs one best-effort read pass over the sensor and emits a
//! gauge sample per readable metric. A failed read costs only its own
//! sample; the other metrics are still emitted.

use std::sync::Mutex;

use prometheus::core::{Collector, Desc};
use prometheus::{proto, GaugeVec, Opts};
use thiserror::Error;

use crate::sensor::{self, Accuracy, Sensor};

/// Errors that can occur while constructing the exporter.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Rounds a reading to the nearest hundredth, halves away from zero.
fn round_to_centi(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Prometheus collector for one BMP/BME-family sensor.
///
/// Owns the single bus connection; reads are serialized through a mutex
/// because the bus protocol does not tolerate interleaved transactions,
/// and the serving framework may dispatch scrapes concurrently.
pub struct SensorExporter<S: Sensor> {
    sensor: Mutex<S>,
    host: String,
    temperature: GaugeVec,
    humidity: GaugeVec,
    pressure: GaugeVec,
}

impl<S: Sensor> SensorExporter<S> {
    /// Creates the exporter, stamping every descriptor with the device's
    /// resolved model name.
    ///
    /// The signature is read once here; a failed read collapses to the
    /// `"unknown"` label rather than an error, since labeling must never
    /// prevent startup once the bootstrap checks have passed.
    pub fn new(mut sensor: S, host: impl Into<String>) -> Result<Self, ExporterError> {
        let sensor_type = match sensor.read_signature() {
            Ok(signature) => sensor::resolve_name(signature),
            Err(_) => sensor::UNKNOWN,
        };

        let gauge = |name: &str, help: &str| -> Result<GaugeVec, prometheus::Error> {
            GaugeVec::new(
                Opts::new(name, help).const_label("sensor_type", sensor_type),
                &["host"],
            )
        };

        Ok(Self {
            sensor: Mutex::new(sensor),
            host: host.into(),
            temperature: gauge("temperature", "Current temperature in celsius")?,
            // Help text typos and the hPa/Pa mismatch below are inherited
            // from the deployed exporter and kept so dashboards keyed on
            // them keep working.
            humidity: gauge("humidity", "Current realtive humidity")?,
            pressure: gauge("pressure", "Current atmospheric pressure in hPa")?,
        })
    }

    /// Returns the host label stamped on every sample.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn emit(&self, gauge: &GaugeVec, value: f64, families: &mut Vec<proto::MetricFamily>) {
        gauge
            .with_label_values(&[self.host.as_str()])
            .set(round_to_centi(value));
        families.extend(gauge.collect());
    }
}

impl<S: Sensor + Send> Collector for SensorExporter<S> {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = Vec::with_capacity(3);
        descs.extend(self.temperature.desc());
        descs.extend(self.humidity.desc());
        descs.extend(self.pressure.desc());
        descs
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let mut families = Vec::with_capacity(3);
        // A poisoned lock only means a previous scrape panicked mid-read;
        // the sensor itself holds no state between transactions.
        let mut sensor = match self.sensor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match sensor.read_temperature_c(Accuracy::High) {
            Ok(value) => self.emit(&self.temperature, value, &mut families),
            Err(err) => tracing::error!(error = %err, "problem reading temperature"),
        }

        match sensor.read_pressure_pa(Accuracy::High) {
            Ok(value) => self.emit(&self.pressure, value, &mut families),
            Err(err) => tracing::error!(error = %err, "problem reading pressure"),
        }

        match sensor.read_humidity_rh(Accuracy::High) {
            Ok(Some(value)) => self.emit(&self.humidity, value, &mut families),
            Ok(None) => tracing::info!("humidity not supported on this sensor"),
            Err(err) => tracing::error!(error = %err, "problem reading humidity"),
        }

        families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::MockSensor;
    use prometheus::{Registry, TextEncoder};

    fn family_names(families: &[proto::MetricFamily]) -> Vec<String> {
        let mut names: Vec<String> = families.iter().map(|f| f.get_name().to_string()).collect();
        names.sort();
        names
    }

    fn sample_value(families: &[proto::MetricFamily], name: &str) -> f64 {
        let family = families
            .iter()
            .find(|f| f.get_name() == name)
            .unwrap_or_else(|| panic!("no family named {name}"));
        family.get_metric()[0].get_gauge().get_value()
    }

    fn label_value(metric: &proto::Metric, name: &str) -> Option<String> {
        metric
            .get_label()
            .iter()
            .find(|l| l.get_name() == name)
            .map(|l| l.get_value().to_string())
    }

    #[test]
    fn test_describe_three_distinct_descriptors() {
        let exporter = SensorExporter::new(MockSensor::new(), "testhost").unwrap();
        assert_eq!(exporter.host(), "testhost");

        let descs = exporter.desc();
        assert_eq!(descs.len(), 3);

        let mut names: Vec<&str> = descs.iter().map(|d| d.fq_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["humidity", "pressure", "temperature"]);

        for desc in descs {
            assert_eq!(desc.variable_labels, vec!["host".to_string()]);
            assert_eq!(desc.const_label_pairs.len(), 1);
            assert_eq!(desc.const_label_pairs[0].get_name(), "sensor_type");
            assert_eq!(desc.const_label_pairs[0].get_value(), "BME280");
        }
    }

    #[test]
    fn test_collect_emits_all_three_rounded() {
        let sensor = MockSensor::new().with_readings(21.2345, 101_325.456, 48.671);
        let exporter = SensorExporter::new(sensor, "testhost").unwrap();

        let families = exporter.collect();
        assert_eq!(
            family_names(&families),
            vec!["humidity", "pressure", "temperature"]
        );
        assert_eq!(sample_value(&families, "temperature"), 21.23);
        assert_eq!(sample_value(&families, "pressure"), 101_325.46);
        assert_eq!(sample_value(&families, "humidity"), 48.67);
    }

    #[test]
    fn test_temperature_failure_does_not_suppress_others() {
        let sensor = MockSensor::new().failing_temperature();
        let exporter = SensorExporter::new(sensor, "testhost").unwrap();

        let families = exporter.collect();
        assert_eq!(family_names(&families), vec!["humidity", "pressure"]);
    }

    #[test]
    fn test_humidity_unsupported_emits_two_samples() {
        let sensor = MockSensor::new().without_humidity().with_signature(0x58);
        let exporter = SensorExporter::new(sensor, "testhost").unwrap();

        for _ in 0..3 {
            let families = exporter.collect();
            assert_eq!(family_names(&families), vec!["pressure", "temperature"]);
        }
    }

    #[test]
    fn test_all_reads_failing_yields_empty_scrape() {
        let sensor = MockSensor::new()
            .failing_temperature()
            .failing_pressure()
            .failing_humidity();
        let exporter = SensorExporter::new(sensor, "testhost").unwrap();

        assert!(exporter.collect().is_empty());
    }

    #[test]
    fn test_one_read_per_metric_per_scrape() {
        let sensor = MockSensor::new().failing_pressure();
        let counters = sensor.counters();
        let exporter = SensorExporter::new(sensor, "testhost").unwrap();

        exporter.collect();
        exporter.collect();

        assert_eq!(counters.temperature(), 2);
        assert_eq!(counters.pressure(), 2);
        assert_eq!(counters.humidity(), 2);
    }

    #[test]
    fn test_labels_constant_across_scrapes() {
        let exporter = SensorExporter::new(MockSensor::new(), "testhost").unwrap();

        for _ in 0..2 {
            let families = exporter.collect();
            assert_eq!(families.len(), 3);
            for family in &families {
                for metric in family.get_metric() {
                    assert_eq!(label_value(metric, "host").as_deref(), Some("testhost"));
                    assert_eq!(
                        label_value(metric, "sensor_type").as_deref(),
                        Some("BME280")
                    );
                }
            }
        }
    }

    #[test]
    fn test_unrecognized_signature_labels_unknown() {
        let exporter =
            SensorExporter::new(MockSensor::new().with_signature(0x42), "testhost").unwrap();
        let descs = exporter.desc();
        assert_eq!(descs[0].const_label_pairs[0].get_value(), "unknown");
    }

    #[test]
    fn test_signature_read_failure_labels_unknown() {
        let exporter =
            SensorExporter::new(MockSensor::new().failing_signature(), "testhost").unwrap();
        let descs = exporter.desc();
        assert_eq!(descs[0].const_label_pairs[0].get_value(), "unknown");
    }

    #[test]
    fn test_registry_round_trip_text_encoding() {
        let sensor = MockSensor::new().with_readings(20.0, 99_000.0, 55.0);
        let exporter = SensorExporter::new(sensor, "testhost").unwrap();

        let registry = Registry::new();
        registry.register(Box::new(exporter)).unwrap();

        let output = TextEncoder::new()
            .encode_to_string(&registry.gather())
            .unwrap();
        assert!(output.contains("temperature"));
        assert!(output.contains("pressure"));
        assert!(output.contains("humidity"));
        assert!(output.contains("host=\"testhost\""));
        assert!(output.contains("sensor_type=\"BME280\""));
        assert!(output.contains("Current atmospheric pressure in hPa"));
    }

    #[test]
    fn test_rounding_policy() {
        assert_eq!(round_to_centi(21.2345), 21.23);
        // 21.125 is exactly representable, so this is a true half case.
        assert_eq!(round_to_centi(21.125), 21.13);
        assert_eq!(round_to_centi(-21.125), -21.13);
        assert_eq!(round_to_centi(21.239), 21.24);
        assert_eq!(round_to_centi(0.0), 0.0);
    }
}
