//! I2C-backed sensor driver for the BMP280/BME280 register family.
//!
//! Implements forced-mode measurement with the compensation arithmetic from
//! the Bosch datasheets. BMP180 and BMP388 use a different register map and
//! are rejected at construction.

use std::thread;
use std::time::Duration;

use rppal::i2c::I2c;

use super::{Accuracy, Sensor, SensorError, SensorModel};

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIB_TP: u8 = 0x88;
const REG_CALIB_H1: u8 = 0xA1;
const REG_CALIB_H2: u8 = 0xE1;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_DATA: u8 = 0xF7;

const MODE_FORCED: u8 = 0x01;
const STATUS_MEASURING: u8 = 0x08;

// 16x oversampling on all channels completes well within this.
const MEASUREMENT_POLL: Duration = Duration::from_millis(5);
const MEASUREMENT_POLL_LIMIT: u32 = 40;

/// Compensation coefficients read from the device at open.
#[derive(Debug, Default, Clone)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

/// One compensated forced-mode measurement.
#[derive(Debug, Clone, Copy)]
struct Measurement {
    temperature_c: f64,
    pressure_pa: f64,
    humidity_rh: Option<f64>,
}

/// Sensor driver over a Linux I2C bus.
pub struct I2cSensor {
    bus: I2c,
    model: SensorModel,
    calibration: Calibration,
}

impl I2cSensor {
    /// Opens the bus, addresses the device and reads its calibration data.
    pub fn open(model: SensorModel, bus_id: u8, address: u8) -> Result<Self, SensorError> {
        if !matches!(model, SensorModel::Bmp280 | SensorModel::Bme280) {
            return Err(SensorError::UnsupportedModel(model.name().to_string()));
        }

        let mut bus = I2c::with_bus(bus_id).map_err(bus_err)?;
        bus.set_slave_address(u16::from(address)).map_err(bus_err)?;

        let mut sensor = Self {
            bus,
            model,
            calibration: Calibration::default(),
        };
        sensor.calibration = sensor.read_calibration()?;
        Ok(sensor)
    }

    fn read_calibration(&mut self) -> Result<Calibration, SensorError> {
        let mut tp = [0u8; 24];
        self.bus.block_read(REG_CALIB_TP, &mut tp).map_err(bus_err)?;

        let word = |i: usize| u16::from_le_bytes([tp[i], tp[i + 1]]);
        let mut calibration = Calibration {
            t1: word(0),
            t2: word(2) as i16,
            t3: word(4) as i16,
            p1: word(6),
            p2: word(8) as i16,
            p3: word(10) as i16,
            p4: word(12) as i16,
            p5: word(14) as i16,
            p6: word(16) as i16,
            p7: word(18) as i16,
            p8: word(20) as i16,
            p9: word(22) as i16,
            ..Calibration::default()
        };

        if self.model.has_humidity() {
            calibration.h1 = self.bus.smbus_read_byte(REG_CALIB_H1).map_err(bus_err)?;
            let mut h = [0u8; 7];
            self.bus.block_read(REG_CALIB_H2, &mut h).map_err(bus_err)?;
            calibration.h2 = i16::from_le_bytes([h[0], h[1]]);
            calibration.h3 = h[2];
            // h4/h5 share the nibble register 0xE5.
            calibration.h4 = (i16::from(h[3] as i8) << 4) | i16::from(h[4] & 0x0F);
            calibration.h5 = (i16::from(h[5] as i8) << 4) | i16::from(h[4] >> 4);
            calibration.h6 = h[6] as i8;
        }

        Ok(calibration)
    }

    /// Runs one forced-mode measurement cycle and reads back all channels.
    fn measure(&mut self, accuracy: Accuracy) -> Result<Measurement, SensorError> {
        let oversampling = accuracy.oversampling();

        if self.model.has_humidity() {
            self.bus
                .smbus_write_byte(REG_CTRL_HUM, oversampling)
                .map_err(bus_err)?;
        }
        let ctrl = (oversampling << 5) | (oversampling << 2) | MODE_FORCED;
        self.bus
            .smbus_write_byte(REG_CTRL_MEAS, ctrl)
            .map_err(bus_err)?;

        let mut polls = 0;
        loop {
            let status = self.bus.smbus_read_byte(REG_STATUS).map_err(bus_err)?;
            if status & STATUS_MEASURING == 0 {
                break;
            }
            polls += 1;
            if polls > MEASUREMENT_POLL_LIMIT {
                return Err(SensorError::ReadFailed(
                    "measurement did not complete in time".into(),
                ));
            }
            thread::sleep(MEASUREMENT_POLL);
        }

        let mut data = [0u8; 8];
        self.bus.block_read(REG_DATA, &mut data).map_err(bus_err)?;

        let adc_p = (u32::from(data[0]) << 12) | (u32::from(data[1]) << 4) | (u32::from(data[2]) >> 4);
        let adc_t = (u32::from(data[3]) << 12) | (u32::from(data[4]) << 4) | (u32::from(data[5]) >> 4);
        let adc_h = (u32::from(data[6]) << 8) | u32::from(data[7]);

        let (temperature_c, t_fine) = self.compensate_temperature(adc_t);
        let pressure_pa = self.compensate_pressure(adc_p, t_fine)?;
        let humidity_rh = if self.model.has_humidity() {
            Some(self.compensate_humidity(adc_h, t_fine))
        } else {
            None
        };

        Ok(Measurement {
            temperature_c,
            pressure_pa,
            humidity_rh,
        })
    }

    // Double-precision compensation formulas from the Bosch BME280 datasheet
    // (section 4.2.3). t_fine carries temperature into the other channels.

    fn compensate_temperature(&self, adc_t: u32) -> (f64, f64) {
        let c = &self.calibration;
        let adc_t = f64::from(adc_t);
        let var1 = (adc_t / 16384.0 - f64::from(c.t1) / 1024.0) * f64::from(c.t2);
        let var2 = (adc_t / 131072.0 - f64::from(c.t1) / 8192.0).powi(2) * f64::from(c.t3);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    fn compensate_pressure(&self, adc_p: u32, t_fine: f64) -> Result<f64, SensorError> {
        let c = &self.calibration;
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(c.p6) / 32768.0;
        var2 += var1 * f64::from(c.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(c.p4) * 65536.0;
        var1 = (f64::from(c.p3) * var1 * var1 / 524288.0 + f64::from(c.p2) * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(c.p1);
        if var1 == 0.0 {
            return Err(SensorError::ReadFailed(
                "pressure compensation divided by zero".into(),
            ));
        }
        let mut pressure = 1048576.0 - f64::from(adc_p);
        pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
        var1 = f64::from(c.p9) * pressure * pressure / 2147483648.0;
        var2 = pressure * f64::from(c.p8) / 32768.0;
        Ok(pressure + (var1 + var2 + f64::from(c.p7)) / 16.0)
    }

    fn compensate_humidity(&self, adc_h: u32, t_fine: f64) -> f64 {
        let c = &self.calibration;
        let var_h = t_fine - 76800.0;
        let humidity = (f64::from(adc_h)
            - (f64::from(c.h4) * 64.0 + f64::from(c.h5) / 16384.0 * var_h))
            * (f64::from(c.h2) / 65536.0
                * (1.0
                    + f64::from(c.h6) / 67108864.0
                        * var_h
                        * (1.0 + f64::from(c.h3) / 67108864.0 * var_h)));
        let humidity = humidity * (1.0 - f64::from(c.h1) * humidity / 524288.0);
        humidity.clamp(0.0, 100.0)
    }
}

impl Sensor for I2cSensor {
    fn read_temperature_c(&mut self, accuracy: Accuracy) -> Result<f64, SensorError> {
        Ok(self.measure(accuracy)?.temperature_c)
    }

    fn read_pressure_pa(&mut self, accuracy: Accuracy) -> Result<f64, SensorError> {
        Ok(self.measure(accuracy)?.pressure_pa)
    }

    fn read_humidity_rh(&mut self, accuracy: Accuracy) -> Result<Option<f64>, SensorError> {
        if !self.model.has_humidity() {
            return Ok(None);
        }
        Ok(self.measure(accuracy)?.humidity_rh)
    }

    fn read_signature(&mut self) -> Result<u8, SensorError> {
        self.bus.smbus_read_byte(REG_CHIP_ID).map_err(bus_err)
    }

    fn validate_coefficients(&mut self) -> Result<(), SensorError> {
        let mut raw = [0u8; 24];
        self.bus.block_read(REG_CALIB_TP, &mut raw).map_err(bus_err)?;
        // A blank or failed EEPROM reads back as all zeros or all ones.
        if raw.iter().all(|&b| b == 0x00) || raw.iter().all(|&b| b == 0xFF) {
            return Err(SensorError::InvalidCoefficients);
        }
        Ok(())
    }
}

fn bus_err(err: rppal::i2c::Error) -> SensorError {
    SensorError::Bus(err.to_string())
}
