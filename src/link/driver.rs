//! Radio Driver Capability
//!
//! The seam between the session state machine and the physical radio. The
//! driver owns modulation, framing, and its own transmit timeout; the
//! session owns sequencing and result classification. Drivers report raw
//! `i16` result codes from the [`codes`] namespace, which
//! [`interpret_result`](crate::link::session::interpret_result) classifies.

use crate::link::signal::CompletionSignal;
use crate::types::LinkConfig;

/// Result codes reported by radio drivers
///
/// Zero is success; failures are negative and parameter-specific so a
/// rejected configuration names the field at fault.
pub mod codes {
    /// Operation succeeded
    pub const OK: i16 = 0;
    /// Unclassified failure
    pub const UNKNOWN: i16 = -1;
    /// Device not detected on the bus
    pub const CHIP_NOT_FOUND: i16 = -2;
    /// Payload exceeds the modem's maximum frame
    pub const PACKET_TOO_LONG: i16 = -4;
    /// Transmission did not complete in the driver's window
    pub const TX_TIMEOUT: i16 = -5;
    /// Reception did not complete in the driver's window
    pub const RX_TIMEOUT: i16 = -6;
    /// Inbound packet failed its integrity check
    pub const CRC_MISMATCH: i16 = -7;
    /// Bandwidth value not supported by the device
    pub const INVALID_BANDWIDTH: i16 = -8;
    /// Spreading factor outside the device's range
    pub const INVALID_SPREADING_FACTOR: i16 = -9;
    /// Coding rate outside the device's range
    pub const INVALID_CODING_RATE: i16 = -10;
    /// Carrier frequency outside the device's range
    pub const INVALID_FREQUENCY: i16 = -12;
    /// Output power outside the device's range
    pub const INVALID_OUTPUT_POWER: i16 = -13;
    /// LNA gain setting outside the device's range
    pub const INVALID_GAIN: i16 = -14;
    /// Operation attempted in a device mode that does not allow it
    pub const WRONG_MODE: i16 = -20;
}

/// Radio driver capability consumed by the session
///
/// Exactly one session owns exactly one driver. All methods are called from
/// the main flow; the only interrupt-side effect a driver has is raising the
/// bound [`CompletionSignal`] when an armed operation completes.
pub trait RadioDriver {
    /// Configure the device with `config`.
    ///
    /// Invalid parameter combinations are rejected here with the matching
    /// [`codes`] value.
    fn begin(&mut self, config: &LinkConfig) -> i16;

    /// Register the completion signal the device raises when an armed
    /// operation finishes.
    ///
    /// Called once, after a successful `begin`.
    fn bind_completion(&mut self, signal: &'static CompletionSignal);

    /// Arm the device for inbound reception and return immediately.
    fn start_receive(&mut self) -> i16;

    /// Length in bytes of the packet the device is holding.
    fn packet_length(&mut self) -> usize;

    /// Copy the held packet into `buf` (up to `buf.len()` bytes).
    fn read_data(&mut self, buf: &mut [u8]) -> i16;

    /// Transmit `payload`, blocking until the device confirms or fails.
    ///
    /// The transmit timeout belongs to the driver, not the session.
    fn transmit(&mut self, payload: &[u8]) -> i16;
}

/// Millisecond sleep capability
///
/// Injected wherever the link paces itself (completion polling, the
/// inter-cycle interval) so waits stay observable and testable.
pub trait Delay {
    /// Block for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);
}
