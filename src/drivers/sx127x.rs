//! SX127x LoRa Transceiver Driver
//!
//! Register-level driver for SX1276-family modules (RFM95 and friends) over
//! SPI. Implements the [`RadioDriver`] capability: configuration at `begin`,
//! non-blocking receive arming with DIO0 signalling completion, and blocking
//! transmit with the driver-owned timeout.
//!
//! DIO0 is routed to an EXTI line; the binary's edge task raises the bound
//! [`CompletionSignal`] when a packet lands. Transmit completion is polled
//! over SPI instead, so the transmit path works without the edge task.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};

use crate::link::driver::{codes, RadioDriver};
use crate::link::signal::CompletionSignal;
use crate::types::LinkConfig;

/// SX127x register addresses (LoRa page)
mod reg {
    pub const FIFO: u8 = 0x00;
    pub const OP_MODE: u8 = 0x01;
    pub const FRF_MSB: u8 = 0x06;
    pub const FRF_MID: u8 = 0x07;
    pub const FRF_LSB: u8 = 0x08;
    pub const PA_CONFIG: u8 = 0x09;
    pub const LNA: u8 = 0x0C;
    pub const FIFO_ADDR_PTR: u8 = 0x0D;
    pub const FIFO_TX_BASE_ADDR: u8 = 0x0E;
    pub const FIFO_RX_BASE_ADDR: u8 = 0x0F;
    pub const FIFO_RX_CURRENT_ADDR: u8 = 0x10;
    pub const IRQ_FLAGS: u8 = 0x12;
    pub const RX_NB_BYTES: u8 = 0x13;
    pub const MODEM_CONFIG_1: u8 = 0x1D;
    pub const MODEM_CONFIG_2: u8 = 0x1E;
    pub const PREAMBLE_MSB: u8 = 0x20;
    pub const PREAMBLE_LSB: u8 = 0x21;
    pub const PAYLOAD_LENGTH: u8 = 0x22;
    pub const MODEM_CONFIG_3: u8 = 0x26;
    pub const SYNC_WORD: u8 = 0x39;
    pub const DIO_MAPPING_1: u8 = 0x40;
    pub const VERSION: u8 = 0x42;
    pub const PA_DAC: u8 = 0x4D;
}

/// Operating mode bits (RegOpMode)
mod opmode {
    pub const LONG_RANGE: u8 = 0x80;
    pub const SLEEP: u8 = 0x00;
    pub const STANDBY: u8 = 0x01;
    pub const TX: u8 = 0x03;
    pub const RX_CONTINUOUS: u8 = 0x05;
}

/// Interrupt flag bits (RegIrqFlags)
mod irq {
    pub const TX_DONE: u8 = 0x08;
    pub const PAYLOAD_CRC_ERROR: u8 = 0x20;
    pub const ALL: u8 = 0xFF;
}

/// Silicon revision reported by SX1276-family parts
const CHIP_VERSION: u8 = 0x12;

/// FRF register step in Hz (32 MHz crystal / 2^19)
const FRF_STEP_HZ: f32 = 61.035_156;

/// Maximum LoRa payload the modem will frame
const MAX_PAYLOAD: usize = 255;

/// Window for one blocking transmit, in milliseconds
const TX_TIMEOUT_MS: u32 = 5_000;

/// SX1276-family LoRa transceiver over SPI
pub struct Sx127x<SPI, RST, D> {
    spi: SPI,
    reset: RST,
    delay: D,
    completion: Option<&'static CompletionSignal>,
}

impl<SPI, RST, D> Sx127x<SPI, RST, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    D: DelayNs,
{
    /// Create a driver over an SPI device and a reset pin.
    ///
    /// The device is untouched until `begin`.
    pub const fn new(spi: SPI, reset: RST, delay: D) -> Self {
        Self {
            spi,
            reset,
            delay,
            completion: None,
        }
    }

    /// Signal bound by the session, raised by the DIO0 edge task
    #[must_use]
    pub const fn completion(&self) -> Option<&'static CompletionSignal> {
        self.completion
    }

    fn read_register(&mut self, register: u8) -> Result<u8, i16> {
        let mut value = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[register & 0x7F]),
                Operation::Read(&mut value),
            ])
            .map_err(|_| codes::UNKNOWN)?;
        Ok(value[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), i16> {
        self.spi
            .write(&[register | 0x80, value])
            .map_err(|_| codes::UNKNOWN)
    }

    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), i16> {
        self.spi
            .transaction(&mut [Operation::Write(&[reg::FIFO]), Operation::Read(buf)])
            .map_err(|_| codes::UNKNOWN)
    }

    fn write_fifo(&mut self, data: &[u8]) -> Result<(), i16> {
        self.spi
            .transaction(&mut [
                Operation::Write(&[reg::FIFO | 0x80]),
                Operation::Write(data),
            ])
            .map_err(|_| codes::UNKNOWN)
    }

    /// Pulse the reset line per the datasheet power-on sequence.
    fn reset_device(&mut self) -> Result<(), i16> {
        self.reset.set_low().map_err(|_| codes::UNKNOWN)?;
        self.delay.delay_ms(1);
        self.reset.set_high().map_err(|_| codes::UNKNOWN)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    fn try_begin(&mut self, config: &LinkConfig) -> Result<(), i16> {
        self.reset_device()?;

        if self.read_register(reg::VERSION)? != CHIP_VERSION {
            return Err(codes::CHIP_NOT_FOUND);
        }

        let bw_bits = bandwidth_bits(config.bandwidth_khz)?;
        if !(7..=12).contains(&config.spreading_factor) {
            return Err(codes::INVALID_SPREADING_FACTOR);
        }
        if !(5..=8).contains(&config.coding_rate) {
            return Err(codes::INVALID_CODING_RATE);
        }
        if !(137.0..=1020.0).contains(&config.frequency_mhz) {
            return Err(codes::INVALID_FREQUENCY);
        }
        if !(2..=20).contains(&config.output_power_dbm) {
            return Err(codes::INVALID_OUTPUT_POWER);
        }
        if config.gain > 6 {
            return Err(codes::INVALID_GAIN);
        }

        // LoRa mode can only be selected from sleep
        self.write_register(reg::OP_MODE, opmode::SLEEP)?;
        self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::SLEEP)?;

        let frf = (config.frequency_mhz * 1_000_000.0 / FRF_STEP_HZ) as u32;
        self.write_register(reg::FRF_MSB, (frf >> 16) as u8)?;
        self.write_register(reg::FRF_MID, (frf >> 8) as u8)?;
        self.write_register(reg::FRF_LSB, frf as u8)?;

        // Explicit header, CRC on
        self.write_register(
            reg::MODEM_CONFIG_1,
            (bw_bits << 4) | ((config.coding_rate - 4) << 1),
        )?;
        self.write_register(reg::MODEM_CONFIG_2, (config.spreading_factor << 4) | 0x04)?;

        // Low-data-rate optimization is mandatory above 16 ms symbols
        let symbol_ms = (1u32 << config.spreading_factor) as f32 / config.bandwidth_khz;
        let mut config3 = if symbol_ms > 16.0 { 0x08 } else { 0x00 };
        if config.gain == 0 {
            config3 |= 0x04; // AGC
        } else {
            self.write_register(reg::LNA, (config.gain << 5) | 0x03)?;
        }
        self.write_register(reg::MODEM_CONFIG_3, config3)?;

        self.write_register(reg::PREAMBLE_MSB, (config.preamble_length >> 8) as u8)?;
        self.write_register(reg::PREAMBLE_LSB, config.preamble_length as u8)?;
        self.write_register(reg::SYNC_WORD, config.sync_word)?;

        // PA_BOOST output; +20 dBm needs the high-power DAC trim
        if config.output_power_dbm <= 17 {
            self.write_register(reg::PA_CONFIG, 0x80 | (config.output_power_dbm - 2) as u8)?;
            self.write_register(reg::PA_DAC, 0x84)?;
        } else {
            self.write_register(reg::PA_CONFIG, 0x8F)?;
            self.write_register(reg::PA_DAC, 0x87)?;
        }

        self.write_register(reg::FIFO_TX_BASE_ADDR, 0x80)?;
        self.write_register(reg::FIFO_RX_BASE_ADDR, 0x00)?;
        self.write_register(reg::IRQ_FLAGS, irq::ALL)?;
        self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::STANDBY)?;
        Ok(())
    }

    fn try_start_receive(&mut self) -> Result<(), i16> {
        self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::STANDBY)?;
        self.write_register(reg::IRQ_FLAGS, irq::ALL)?;
        // DIO0 = RxDone
        self.write_register(reg::DIO_MAPPING_1, 0x00)?;
        self.write_register(reg::FIFO_ADDR_PTR, 0x00)?;
        self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::RX_CONTINUOUS)
    }

    fn try_read_data(&mut self, buf: &mut [u8]) -> Result<(), i16> {
        let flags = self.read_register(reg::IRQ_FLAGS)?;
        if flags & irq::PAYLOAD_CRC_ERROR != 0 {
            self.write_register(reg::IRQ_FLAGS, irq::ALL)?;
            return Err(codes::CRC_MISMATCH);
        }

        let current = self.read_register(reg::FIFO_RX_CURRENT_ADDR)?;
        self.write_register(reg::FIFO_ADDR_PTR, current)?;
        self.read_fifo(buf)?;
        self.write_register(reg::IRQ_FLAGS, irq::ALL)
    }

    fn try_transmit(&mut self, payload: &[u8]) -> Result<(), i16> {
        if payload.len() > MAX_PAYLOAD {
            return Err(codes::PACKET_TOO_LONG);
        }

        self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::STANDBY)?;
        self.write_register(reg::IRQ_FLAGS, irq::ALL)?;
        // DIO0 = TxDone (completion is still polled below; the mapping keeps
        // the line quiet for the receive task)
        self.write_register(reg::DIO_MAPPING_1, 0x40)?;
        self.write_register(reg::FIFO_ADDR_PTR, 0x80)?;
        self.write_register(reg::PAYLOAD_LENGTH, payload.len() as u8)?;
        self.write_fifo(payload)?;
        self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::TX)?;

        let mut waited_ms = 0;
        loop {
            if self.read_register(reg::IRQ_FLAGS)? & irq::TX_DONE != 0 {
                self.write_register(reg::IRQ_FLAGS, irq::ALL)?;
                return Ok(());
            }
            if waited_ms >= TX_TIMEOUT_MS {
                self.write_register(reg::OP_MODE, opmode::LONG_RANGE | opmode::STANDBY)?;
                return Err(codes::TX_TIMEOUT);
            }
            self.delay.delay_ms(1);
            waited_ms += 1;
        }
    }
}

impl<SPI, RST, D> RadioDriver for Sx127x<SPI, RST, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    D: DelayNs,
{
    fn begin(&mut self, config: &LinkConfig) -> i16 {
        match self.try_begin(config) {
            Ok(()) => codes::OK,
            Err(code) => code,
        }
    }

    fn bind_completion(&mut self, signal: &'static CompletionSignal) {
        self.completion = Some(signal);
    }

    fn start_receive(&mut self) -> i16 {
        match self.try_start_receive() {
            Ok(()) => codes::OK,
            Err(code) => code,
        }
    }

    fn packet_length(&mut self) -> usize {
        self.read_register(reg::RX_NB_BYTES).map_or(0, usize::from)
    }

    fn read_data(&mut self, buf: &mut [u8]) -> i16 {
        match self.try_read_data(buf) {
            Ok(()) => codes::OK,
            Err(code) => code,
        }
    }

    fn transmit(&mut self, payload: &[u8]) -> i16 {
        match self.try_transmit(payload) {
            Ok(()) => codes::OK,
            Err(code) => code,
        }
    }
}

/// Map a bandwidth in kHz onto RegModemConfig1 bits.
fn bandwidth_bits(bandwidth_khz: f32) -> Result<u8, i16> {
    // Compare in tenths of a kHz to sidestep float equality
    match (bandwidth_khz * 10.0) as u32 {
        78 => Ok(0),
        104 => Ok(1),
        156 => Ok(2),
        208 => Ok(3),
        312 => Ok(4),
        417 => Ok(5),
        625 => Ok(6),
        1250 => Ok(7),
        2500 => Ok(8),
        5000 => Ok(9),
        _ => Err(codes::INVALID_BANDWIDTH),
    }
}
