//! Exporter binary: bootstrap and serve loop.
//!
//! Startup is fail-fast: a bad model name, an unreachable bus, an
//! unreadable signature or invalid calibration data all terminate the
//! process before the scrape endpoint becomes reachable.

use bsb_exporter::config::Config;
use bsb_exporter::sensor::SensorModel;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    init_tracing(config.verbose);

    let host = resolve_hostname();
    info!(
        host = %host,
        model = %config.model,
        "Starting bsb-exporter v{}",
        bsb_exporter::VERSION
    );

    let model = match SensorModel::from_name(&config.model) {
        Ok(model) => model,
        Err(err) => {
            error!(error = %err, "Invalid sensor model");
            std::process::exit(1);
        }
    };

    let address = match config.parse_i2c_address() {
        Ok(address) => address,
        Err(err) => {
            error!(error = %err, "Invalid I2C address");
            std::process::exit(1);
        }
    };

    #[cfg(feature = "hardware")]
    {
        let sensor =
            match bsb_exporter::sensor::I2cSensor::open(model, config.i2c_bus, address) {
                Ok(sensor) => sensor,
                Err(err) => {
                    error!(error = %err, "Failed to open sensor");
                    std::process::exit(1);
                }
            };
        serve(sensor, host, config.port).await;
    }

    #[cfg(not(feature = "hardware"))]
    {
        let _ = (model, address);
        error!("Built without the `hardware` feature; no sensor backend available");
        std::process::exit(1);
    }
}

/// Runs the remaining bootstrap checks against an open sensor, then blocks
/// serving scrapes until externally terminated.
#[cfg(feature = "hardware")]
async fn serve<S: bsb_exporter::sensor::Sensor + Send + 'static>(
    mut sensor: S,
    host: String,
    port: u16,
) {
    use bsb_exporter::exporter::{ExporterServer, ExporterServerConfig, SensorExporter};
    use prometheus::Registry;

    let signature = match sensor.read_signature() {
        Ok(signature) => signature,
        Err(err) => {
            error!(error = %err, "Failed to read sensor signature");
            std::process::exit(1);
        }
    };
    info!("This Bosch Sensortec sensor has signature: 0x{signature:02x}");

    if let Err(err) = sensor.validate_coefficients() {
        error!(error = %err, "Invalid calibration coefficients");
        std::process::exit(1);
    }

    let exporter = match SensorExporter::new(sensor, host) {
        Ok(exporter) => exporter,
        Err(err) => {
            error!(error = %err, "Failed to build exporter");
            std::process::exit(1);
        }
    };

    let registry = Registry::new();
    if let Err(err) = registry.register(Box::new(exporter)) {
        error!(error = %err, "Failed to register collector");
        std::process::exit(1);
    }

    // All the work happens at scrape time, so just sit here serving.
    let server = ExporterServer::new(ExporterServerConfig::with_port(port), registry);
    if let Err(err) = server.run().await {
        error!(error = %err, "Metrics server failed");
        std::process::exit(1);
    }
}

/// Resolves the host label via the `hostname` command, falling back to
/// `"unknown"` so a label value always exists.
fn resolve_hostname() -> String {
    std::process::Command::new("hostname")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();
}
