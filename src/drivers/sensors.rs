//! Telemetry Sensor Adapters
//!
//! Thin adapters that expose the flight sensors through the [`Sensor`]
//! capability: an NMEA GPS on a UART, an MPU6050 inertial unit and a BME280
//! environmental sensor on the I2C bus. Readings are formatted as the short
//! text fragments the aggregator joins into one payload.
//!
//! A sensor that fails mid-flight returns an empty reading; the aggregator
//! passes it through verbatim and the link keeps running degraded.

use core::fmt::Write as _;

use embedded_hal::i2c::I2c;
use embedded_io::{Read, ReadReady};
use heapless::String;

use crate::config::SENSOR_READING_CAPACITY;
use crate::link::aggregator::{Sensor, SensorReading};

/// Longest NMEA sentence we buffer (per NMEA 0183)
const NMEA_LINE_CAPACITY: usize = 96;

/// NMEA GPS receiver on a UART
///
/// Drains whatever the port has buffered each poll and keeps the most
/// recent complete sentence. `read_data` never blocks on the port; between
/// fixes the previous sentence is reported again.
pub struct NmeaGps<R> {
    uart: R,
    line: String<NMEA_LINE_CAPACITY>,
    last: SensorReading,
}

impl<R: Read + ReadReady> NmeaGps<R> {
    /// Create an adapter over a UART receiver
    pub const fn new(uart: R) -> Self {
        Self {
            uart,
            line: String::new(),
            last: String::new(),
        }
    }

    fn accept(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                if self.line.starts_with('$') {
                    self.last.clear();
                    let cut = self.line.len().min(SENSOR_READING_CAPACITY);
                    let _ = self.last.push_str(&self.line[..cut]);
                }
                self.line.clear();
            }
            // Only printable ASCII belongs in a sentence
            0x20..=0x7E => {
                let _ = self.line.push(byte as char);
            }
            _ => {}
        }
    }
}

impl<R: Read + ReadReady> Sensor for NmeaGps<R> {
    fn begin(&mut self) -> bool {
        // A UART has no handshake; presence shows up as sentences
        true
    }

    fn read_data(&mut self) -> SensorReading {
        while self.uart.read_ready().unwrap_or(false) {
            let mut chunk = [0u8; 16];
            match self.uart.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    for &byte in &chunk[..n] {
                        self.accept(byte);
                    }
                }
            }
        }
        self.last.clone()
    }
}

/// MPU6050 register addresses
mod mpu_reg {
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const WHO_AM_I: u8 = 0x75;
}

/// WHO_AM_I value for the MPU6050
const MPU_CHIP_ID: u8 = 0x68;

/// MPU6050 inertial measurement unit on I2C
///
/// Reports raw accelerometer and gyroscope counts; scaling to physical
/// units happens on the ground.
pub struct Mpu6050<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Mpu6050<I> {
    /// Create an adapter over an I2C bus at `address`
    pub const fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }
}

impl<I: I2c> Sensor for Mpu6050<I> {
    fn begin(&mut self) -> bool {
        let mut id = [0u8; 1];
        if self
            .i2c
            .write_read(self.address, &[mpu_reg::WHO_AM_I], &mut id)
            .is_err()
            || id[0] != MPU_CHIP_ID
        {
            return false;
        }
        // Clear sleep mode, internal oscillator
        self.i2c
            .write(self.address, &[mpu_reg::PWR_MGMT_1, 0x00])
            .is_ok()
    }

    fn read_data(&mut self) -> SensorReading {
        let mut raw = [0u8; 14];
        let mut reading = SensorReading::new();
        if self
            .i2c
            .write_read(self.address, &[mpu_reg::ACCEL_XOUT_H], &mut raw)
            .is_err()
        {
            return reading;
        }

        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]);
        // Burst layout: accel xyz, temperature, gyro xyz
        let _ = write!(
            reading,
            "{},{},{},{},{},{}",
            word(0),
            word(2),
            word(4),
            word(8),
            word(10),
            word(12)
        );
        reading
    }
}

/// BME280 register addresses
mod bme_reg {
    pub const CALIB_START: u8 = 0x88;
    pub const ID: u8 = 0xD0;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const TEMP_MSB: u8 = 0xFA;
}

/// Chip id for the BME280
const BME_CHIP_ID: u8 = 0x60;

/// BME280 environmental sensor on I2C, temperature channel
///
/// Applies the datasheet integer compensation so the reading is degrees
/// Celsius with two decimals.
pub struct Bme280<I> {
    i2c: I,
    address: u8,
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
}

impl<I: I2c> Bme280<I> {
    /// Create an adapter over an I2C bus at `address`
    pub const fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            dig_t1: 0,
            dig_t2: 0,
            dig_t3: 0,
        }
    }

    /// Compensated temperature in hundredths of a degree Celsius.
    fn compensate(&self, adc: i32) -> i32 {
        let t1 = i32::from(self.dig_t1);
        let var1 = (((adc >> 3) - (t1 << 1)) * i32::from(self.dig_t2)) >> 11;
        let var2 = ((((adc >> 4) - t1) * ((adc >> 4) - t1)) >> 12) * i32::from(self.dig_t3) >> 14;
        let t_fine = var1 + var2;
        (t_fine * 5 + 128) >> 8
    }
}

impl<I: I2c> Sensor for Bme280<I> {
    fn begin(&mut self) -> bool {
        let mut id = [0u8; 1];
        if self
            .i2c
            .write_read(self.address, &[bme_reg::ID], &mut id)
            .is_err()
            || id[0] != BME_CHIP_ID
        {
            return false;
        }

        let mut calib = [0u8; 6];
        if self
            .i2c
            .write_read(self.address, &[bme_reg::CALIB_START], &mut calib)
            .is_err()
        {
            return false;
        }
        self.dig_t1 = u16::from_le_bytes([calib[0], calib[1]]);
        self.dig_t2 = i16::from_le_bytes([calib[2], calib[3]]);
        self.dig_t3 = i16::from_le_bytes([calib[4], calib[5]]);

        // Temperature x1, pressure skipped, normal mode
        self.i2c
            .write(self.address, &[bme_reg::CTRL_MEAS, 0x23])
            .is_ok()
    }

    fn read_data(&mut self) -> SensorReading {
        let mut raw = [0u8; 3];
        let mut reading = SensorReading::new();
        if self
            .i2c
            .write_read(self.address, &[bme_reg::TEMP_MSB], &mut raw)
            .is_err()
        {
            return reading;
        }

        let adc =
            (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let centi = self.compensate(adc);

        let whole = centi / 100;
        let frac = (centi % 100).unsigned_abs();
        if centi < 0 && whole == 0 {
            let _ = write!(reading, "-0.{frac:02}");
        } else {
            let _ = write!(reading, "{whole}.{frac:02}");
        }
        reading
    }
}
