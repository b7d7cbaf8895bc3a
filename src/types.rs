//! Shared types used across the telemetry link firmware
//!
//! This module defines the domain types for link configuration, packets,
//! persisted records, and the error taxonomy shared by the session, the
//! persistence sink, and the link runner.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::config::{LOG_LINE_CAPACITY, LOG_TEXT_CAPACITY, PACKET_CAPACITY};

/// Radio link configuration
///
/// Immutable after session start. Invalid combinations are not screened
/// here; the radio collaborator rejects them at `begin` with a parameter-
/// specific result code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkConfig {
    /// Carrier frequency in MHz
    pub frequency_mhz: f32,
    /// Signal bandwidth in kHz
    pub bandwidth_khz: f32,
    /// LoRa spreading factor (range checked by the radio at `begin`)
    pub spreading_factor: u8,
    /// Coding rate denominator (5-8, for 4/5 through 4/8)
    pub coding_rate: u8,
    /// Sync word
    pub sync_word: u8,
    /// Transmit output power in dBm
    pub output_power_dbm: i8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    /// LNA gain setting (1 = maximum, 6 = minimum, 0 = automatic)
    pub gain: u8,
}

#[cfg(feature = "embedded")]
impl defmt::Format for LinkConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "LinkConfig({=f32} MHz, {=f32} kHz, SF{=u8}, 4/{=u8})",
            self.frequency_mhz,
            self.bandwidth_khz,
            self.spreading_factor,
            self.coding_rate
        );
    }
}

/// Role this process runs in, fixed at build time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Flight unit: aggregate sensor readings and transmit
    Transmitter,
    /// Ground station: receive packets and log them durably
    Receiver,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Role {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Transmitter => defmt::write!(f, "TX"),
            Self::Receiver => defmt::write!(f, "RX"),
        }
    }
}

/// Startup criticality of a collaborator
///
/// `Critical` collaborators must initialize or the process refuses to run;
/// `BestEffort` collaborators degrade the payload instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Criticality {
    /// Init failure is fatal
    Critical,
    /// Init failure is reported and tolerated
    BestEffort,
}

/// Identifies one of the three telemetry sensors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorId {
    /// GPS position sensor
    Position,
    /// Inertial measurement unit
    Inertial,
    /// Environmental (temperature) sensor
    Environmental,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SensorId {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Position => defmt::write!(f, "GPS"),
            Self::Inertial => defmt::write!(f, "IMU"),
            Self::Environmental => defmt::write!(f, "ENV"),
        }
    }
}

/// One received radio packet
///
/// Holds up to [`PACKET_CAPACITY`] bytes copied out of the device buffer.
/// Instances live for one link cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8, PACKET_CAPACITY>,
}

impl Packet {
    /// Create an empty packet
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Copy bytes into a packet, truncating at capacity
    #[must_use]
    pub fn from_bytes(src: &[u8]) -> Self {
        let take = src.len().min(PACKET_CAPACITY);
        let mut bytes = Vec::new();
        // Cannot fail: `take` is clamped to capacity
        let _ = bytes.extend_from_slice(&src[..take]);
        Self { bytes }
    }

    /// Payload bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check whether the packet is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Packet {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Packet({=usize} bytes)", self.len());
    }
}

/// One unit appended to persistent storage
///
/// Created once per successfully decoded received packet; never mutated
/// after creation. The payload text is stored escaped (see
/// [`LogRecord::format_line`]) so one record always occupies exactly one
/// line in the log file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    sequence_number: u32,
    payload_text: String<LOG_TEXT_CAPACITY>,
}

impl LogRecord {
    /// Build a record from payload text
    #[must_use]
    pub fn new(sequence_number: u32, payload: &str) -> Self {
        Self {
            sequence_number,
            payload_text: escape_payload(payload.as_bytes()),
        }
    }

    /// Build a record from a received packet
    #[must_use]
    pub fn from_packet(sequence_number: u32, packet: &Packet) -> Self {
        Self {
            sequence_number,
            payload_text: escape_payload(packet.as_bytes()),
        }
    }

    /// Sequence number of the packet this record was built from
    #[must_use]
    pub const fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    /// Escaped payload text
    #[must_use]
    pub fn payload_text(&self) -> &str {
        &self.payload_text
    }

    /// Render the full log line, newline-terminated
    #[must_use]
    pub fn format_line(&self) -> String<LOG_LINE_CAPACITY> {
        let mut line = String::new();
        // Cannot fail: LOG_LINE_CAPACITY covers the prefix plus a
        // fully-escaped payload
        let _ = write!(
            line,
            "Packet Num: {}, Contents: {}\n",
            self.sequence_number, self.payload_text
        );
        line
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LogRecord {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "LogRecord(#{=u32})", self.sequence_number);
    }
}

/// Escape payload bytes for single-line persistence.
///
/// Backslash, LF, and CR get two-character escapes; anything else outside
/// printable ASCII becomes `\xHH`. The log stays line-delimited no matter
/// what arrives over the air.
fn escape_payload(bytes: &[u8]) -> String<LOG_TEXT_CAPACITY> {
    let mut out = String::new();
    // None of these can fail: capacity is four bytes per input byte
    for &b in bytes {
        match b {
            b'\\' => {
                let _ = out.push_str("\\\\");
            }
            b'\n' => {
                let _ = out.push_str("\\n");
            }
            b'\r' => {
                let _ = out.push_str("\\r");
            }
            0x20..=0x7E => {
                let _ = out.push(b as char);
            }
            _ => {
                let _ = write!(out, "\\x{b:02X}");
            }
        }
    }
    out
}

/// Fatal initialization errors
///
/// Never recovered in place: the process halts in a reporting loop when the
/// radio cannot be configured, because there is no operator to intervene and
/// running with a faulted radio would mask the hardware problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitError {
    /// The radio rejected the configuration; carries the driver code
    Radio(i16),
    /// A critical sensor failed to initialize
    Sensor(SensorId),
    /// `begin` was called on a session that is already live
    AlreadyActive,
}

#[cfg(feature = "embedded")]
impl defmt::Format for InitError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Radio(code) => defmt::write!(f, "radio init failed, code {=i16}", code),
            Self::Sensor(id) => defmt::write!(f, "sensor init failed: {}", id),
            Self::AlreadyActive => defmt::write!(f, "session already active"),
        }
    }
}

/// Per-cycle radio errors, recovered at the cycle boundary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RadioError {
    /// The operation timed out (device timeout or bounded receive wait)
    Timeout,
    /// Outbound payload exceeds what the modem will frame
    PacketTooLong,
    /// Inbound packet exceeded the receive buffer; carries the packet
    /// truncated to capacity
    RxOverrun(Packet),
    /// The session was not in a state that allows the operation
    WrongState,
    /// Any other driver result code
    Other(i16),
}

#[cfg(feature = "embedded")]
impl defmt::Format for RadioError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(f, "timeout"),
            Self::PacketTooLong => defmt::write!(f, "packet too long"),
            Self::RxOverrun(p) => defmt::write!(f, "rx overrun, kept {=usize} bytes", p.len()),
            Self::WrongState => defmt::write!(f, "wrong session state"),
            Self::Other(code) => defmt::write!(f, "radio failure, code {=i16}", code),
        }
    }
}

/// Per-record storage errors, tagged with the stage that failed
///
/// `CloseFailed` and `UnmountFailed` are reported even when the payload
/// already reached the medium, so the caller can distinguish a lost record
/// from a lost handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageError {
    /// Volume mount failed
    MountFailed(i16),
    /// File open/create failed
    OpenFailed(i16),
    /// Write failed outright
    WriteFailed(i16),
    /// Write succeeded but persisted fewer bytes than the record
    ShortWrite {
        /// Bytes the driver reported written
        written: usize,
        /// Bytes in the formatted record
        expected: usize,
    },
    /// File close failed
    CloseFailed(i16),
    /// Volume unmount failed
    UnmountFailed(i16),
}

#[cfg(feature = "embedded")]
impl defmt::Format for StorageError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::MountFailed(code) => defmt::write!(f, "mount failed, code {=i16}", code),
            Self::OpenFailed(code) => defmt::write!(f, "open failed, code {=i16}", code),
            Self::WriteFailed(code) => defmt::write!(f, "write failed, code {=i16}", code),
            Self::ShortWrite { written, expected } => {
                defmt::write!(f, "short write, {=usize}/{=usize} bytes", written, expected);
            }
            Self::CloseFailed(code) => defmt::write!(f, "close failed, code {=i16}", code),
            Self::UnmountFailed(code) => defmt::write!(f, "unmount failed, code {=i16}", code),
        }
    }
}
