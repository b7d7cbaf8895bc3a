//! Radio Session State Machine
//!
//! Owns the radio driver handle and sequences it through begin, receive,
//! and transmit operations. The session is the only component that touches
//! the device; everything above it works with typed results.

use crate::config::{COMPLETION_POLL_INTERVAL_MS, PACKET_CAPACITY};
use crate::link::driver::{codes, Delay, RadioDriver};
use crate::link::signal::CompletionSignal;
use crate::types::{InitError, LinkConfig, Packet, RadioError};

/// Session lifecycle state
///
/// `Uninitialized` and `FatalFault` are the only non-cycling states; a live
/// session moves `Ready → {Listening | Transmitting} → Ready` indefinitely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Device not yet configured
    #[default]
    Uninitialized,
    /// Configured and idle
    Ready,
    /// Armed for inbound reception
    Listening,
    /// Blocking transmit in progress
    Transmitting,
    /// Configuration was rejected; only `begin` can leave this state
    FatalFault,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SessionState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Uninitialized => defmt::write!(f, "UNINIT"),
            Self::Ready => defmt::write!(f, "READY"),
            Self::Listening => defmt::write!(f, "LISTEN"),
            Self::Transmitting => defmt::write!(f, "TX"),
            Self::FatalFault => defmt::write!(f, "FAULT"),
        }
    }
}

/// Classification of a raw driver result code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Operation succeeded
    Success,
    /// Payload exceeded the modem's maximum frame
    PacketTooLong,
    /// Operation timed out
    Timeout,
    /// Any other failure, with the raw code
    OtherFailure(i16),
}

#[cfg(feature = "embedded")]
impl defmt::Format for OutcomeKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Success => defmt::write!(f, "success"),
            Self::PacketTooLong => defmt::write!(f, "packet too long"),
            Self::Timeout => defmt::write!(f, "timeout"),
            Self::OtherFailure(code) => defmt::write!(f, "failed, code {=i16}", code),
        }
    }
}

/// Classify a raw driver result code.
///
/// Pure function; handling stays with the caller.
#[must_use]
pub const fn interpret_result(code: i16) -> OutcomeKind {
    match code {
        codes::OK => OutcomeKind::Success,
        codes::PACKET_TOO_LONG => OutcomeKind::PacketTooLong,
        codes::TX_TIMEOUT | codes::RX_TIMEOUT => OutcomeKind::Timeout,
        other => OutcomeKind::OtherFailure(other),
    }
}

/// Radio session
///
/// Single owner of one radio device handle. Constructed once in the process
/// entry point and passed into the link runner; no ambient globals.
pub struct RadioSession<D: RadioDriver> {
    driver: D,
    signal: &'static CompletionSignal,
    config: LinkConfig,
    state: SessionState,
    sequence: u32,
}

impl<D: RadioDriver> RadioSession<D> {
    /// Create a session over `driver`, polling `signal` for completions.
    ///
    /// The device is untouched until [`begin`](Self::begin).
    pub fn new(driver: D, signal: &'static CompletionSignal) -> Self {
        Self {
            driver,
            signal,
            config: crate::config::link_config(),
            state: SessionState::Uninitialized,
            sequence: 0,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Sequence number of the most recently decoded packet
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Active link configuration
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Configure the device and bring the session up.
    ///
    /// On success the completion signal is registered as the device's
    /// completion callback and the session becomes `Ready`. On rejection the
    /// session parks in `FatalFault`; `begin` may be retried from there with
    /// a corrected configuration. Calling `begin` on a live session is an
    /// error.
    pub fn begin(&mut self, config: &LinkConfig) -> Result<(), InitError> {
        match self.state {
            SessionState::Uninitialized | SessionState::FatalFault => {}
            _ => return Err(InitError::AlreadyActive),
        }

        let code = self.driver.begin(config);
        if code != codes::OK {
            self.state = SessionState::FatalFault;
            return Err(InitError::Radio(code));
        }

        self.driver.bind_completion(self.signal);
        self.config = *config;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Arm the device for inbound reception.
    ///
    /// Resets the completion signal before arming, in the same cycle, so a
    /// stale completion cannot be attributed to the new operation. Returns
    /// immediately; the session is `Listening` on success.
    pub fn start_receive(&mut self) -> Result<(), RadioError> {
        if self.state != SessionState::Ready {
            return Err(RadioError::WrongState);
        }

        self.signal.reset_before_operation();
        let code = self.driver.start_receive();
        if code != codes::OK {
            return Err(classify_failure(code));
        }

        self.state = SessionState::Listening;
        Ok(())
    }

    /// Wait for the armed receive to complete, polling the signal.
    ///
    /// The wait is bounded: after `timeout_ms` without a completion the
    /// session returns to `Ready` and reports `Timeout`, so a cycle whose
    /// packet never arrives ends instead of spinning forever.
    pub fn await_completion<W: Delay>(
        &mut self,
        delay: &mut W,
        timeout_ms: u32,
    ) -> Result<(), RadioError> {
        if self.state != SessionState::Listening {
            return Err(RadioError::WrongState);
        }

        let mut waited_ms = 0;
        loop {
            if self.signal.poll_and_consume() {
                return Ok(());
            }
            if waited_ms >= timeout_ms {
                self.state = SessionState::Ready;
                return Err(RadioError::Timeout);
            }
            delay.sleep_ms(COMPLETION_POLL_INTERVAL_MS);
            waited_ms += COMPLETION_POLL_INTERVAL_MS;
        }
    }

    /// Abandon an armed receive without reading.
    ///
    /// For callers that pace the completion wait themselves and need the
    /// session back in `Ready` after their own deadline expires.
    pub fn abort_receive(&mut self) {
        if self.state == SessionState::Listening {
            self.state = SessionState::Ready;
        }
    }

    /// Copy the completed packet out of the device.
    ///
    /// Valid only in `Listening`, after a completion. Copies at most
    /// [`PACKET_CAPACITY`] bytes; a device report longer than that yields
    /// [`RadioError::RxOverrun`] carrying the truncated packet, and nothing
    /// is ever written past the buffer bound. The sequence number advances
    /// once per successfully decoded packet.
    pub fn read_data(&mut self) -> Result<Packet, RadioError> {
        if self.state != SessionState::Listening {
            return Err(RadioError::WrongState);
        }
        self.state = SessionState::Ready;

        let reported = self.driver.packet_length();
        let take = reported.min(PACKET_CAPACITY);

        let mut buf = [0u8; PACKET_CAPACITY];
        let code = self.driver.read_data(&mut buf[..take]);
        if code != codes::OK {
            return Err(classify_failure(code));
        }

        let packet = Packet::from_bytes(&buf[..take]);
        if reported > PACKET_CAPACITY {
            return Err(RadioError::RxOverrun(packet));
        }

        self.sequence = self.sequence.wrapping_add(1);
        Ok(packet)
    }

    /// Transmit `payload`, blocking until the device confirms or fails.
    ///
    /// Valid only in `Ready`; the device's own window bounds the wait.
    pub fn transmit(&mut self, payload: &str) -> Result<(), RadioError> {
        if self.state != SessionState::Ready {
            return Err(RadioError::WrongState);
        }

        self.state = SessionState::Transmitting;
        let code = self.driver.transmit(payload.as_bytes());
        self.state = SessionState::Ready;

        match interpret_result(code) {
            OutcomeKind::Success => Ok(()),
            OutcomeKind::PacketTooLong => Err(RadioError::PacketTooLong),
            OutcomeKind::Timeout => Err(RadioError::Timeout),
            OutcomeKind::OtherFailure(code) => Err(RadioError::Other(code)),
        }
    }
}

/// Map a non-success driver code onto the error taxonomy.
fn classify_failure(code: i16) -> RadioError {
    match interpret_result(code) {
        OutcomeKind::PacketTooLong => RadioError::PacketTooLong,
        OutcomeKind::Timeout => RadioError::Timeout,
        _ => RadioError::Other(code),
    }
}
