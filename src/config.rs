//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the telemetry link. There
//! is no runtime configuration surface: the role, link parameters, timings,
//! and storage paths are all fixed here at build time.

use crate::types::{Criticality, LinkConfig, Role};

/// Role this build of the firmware runs in.
///
/// The flight unit is built as `Transmitter`, the ground station as
/// `Receiver`. The role never changes at runtime.
pub const ROLE: Role = Role::Receiver;

/// Carrier frequency in MHz (US 915 MHz ISM band)
pub const FREQUENCY_MHZ: f32 = 915.0;

/// Signal bandwidth in kHz
pub const BANDWIDTH_KHZ: f32 = 125.0;

/// LoRa spreading factor
pub const SPREADING_FACTOR: u8 = 9;

/// LoRa coding rate denominator (4/7)
pub const CODING_RATE: u8 = 7;

/// Sync word (private network)
pub const SYNC_WORD: u8 = 0x12;

/// Transmit output power in dBm (raise to 20 for flight)
pub const OUTPUT_POWER_DBM: i8 = 10;

/// Preamble length in symbols
pub const PREAMBLE_LENGTH: u16 = 8;

/// LNA gain setting (1 = maximum, 6 = minimum)
pub const GAIN: u8 = 1;

/// Receive buffer capacity in bytes
pub const PACKET_CAPACITY: usize = 100;

/// Interval between link cycles in milliseconds (1 Hz cadence)
pub const CYCLE_INTERVAL_MS: u32 = 1000;

/// Upper bound on one receive wait in milliseconds
///
/// A cycle whose completion never arrives ends with a timeout outcome
/// instead of blocking the loop forever.
pub const RECEIVE_WAIT_TIMEOUT_MS: u32 = 10_000;

/// Interval between completion-flag polls while waiting, in milliseconds
pub const COMPLETION_POLL_INTERVAL_MS: u32 = 1;

/// Storage volume identifier for the packet log
pub const LOG_VOLUME: &str = "0:";

/// File the receiver appends packet records to
pub const LOG_PATH: &str = "packets.txt";

/// Init policy for the sensor collaborators.
///
/// The radio is always critical: the link cannot run without it. Sensors
/// default to best-effort so a dead sensor degrades the payload instead of
/// grounding the device; set `Critical` to refuse to start without the full
/// sensor suite.
pub const SENSOR_CRITICALITY: Criticality = Criticality::BestEffort;

/// Capacity of one formatted sensor reading in bytes
pub const SENSOR_READING_CAPACITY: usize = 48;

/// Capacity of one aggregated telemetry payload in bytes
/// (three readings plus two delimiters)
pub const TELEMETRY_PAYLOAD_CAPACITY: usize = 3 * SENSOR_READING_CAPACITY + 2;

/// Capacity of one escaped payload text in bytes
/// (worst case every byte escapes to `\xHH`)
pub const LOG_TEXT_CAPACITY: usize = 4 * PACKET_CAPACITY;

/// Capacity of one formatted log line in bytes (escaped text plus prefix)
pub const LOG_LINE_CAPACITY: usize = LOG_TEXT_CAPACITY + 48;

/// SPI bus frequency for the SX127x module
pub const RADIO_SPI_HZ: u32 = 2_000_000;

/// I2C bus frequency for the sensor bus
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// MPU6050 IMU I2C address
pub const IMU_I2C_ADDR: u8 = 0x68;

/// BME280 environmental sensor I2C address
pub const ENV_I2C_ADDR: u8 = 0x76;

/// GPS UART baud rate
pub const GPS_BAUD: u32 = 9600;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// Status LED (directly on MCU)
    pub const LED_STATUS: &str = "PB3";

    /// SPI1 SCK (SX127x)
    pub const SPI1_SCK: &str = "PA5";

    /// SPI1 MISO (SX127x)
    pub const SPI1_MISO: &str = "PA6";

    /// SPI1 MOSI (SX127x)
    pub const SPI1_MOSI: &str = "PA7";

    /// SX127x chip select (active low)
    pub const RADIO_NSS: &str = "PA4";

    /// SX127x reset (active low)
    pub const RADIO_RST: &str = "PA3";

    /// SX127x DIO0 (operation-complete interrupt)
    pub const RADIO_DIO0: &str = "PB0";

    /// I2C1 SCL (IMU, environmental sensor)
    pub const I2C1_SCL: &str = "PB6";

    /// I2C1 SDA (IMU, environmental sensor)
    pub const I2C1_SDA: &str = "PB7";

    /// GPS UART TX (MCU side)
    pub const GPS_TX: &str = "PA9";

    /// GPS UART RX (MCU side)
    pub const GPS_RX: &str = "PA10";
}

/// Build the reference link configuration
#[must_use]
pub const fn link_config() -> LinkConfig {
    LinkConfig {
        frequency_mhz: FREQUENCY_MHZ,
        bandwidth_khz: BANDWIDTH_KHZ,
        spreading_factor: SPREADING_FACTOR,
        coding_rate: CODING_RATE,
        sync_word: SYNC_WORD,
        output_power_dbm: OUTPUT_POWER_DBM,
        preamble_length: PREAMBLE_LENGTH,
        gain: GAIN,
    }
}
