//! Link Cycle Runner
//!
//! The top-level loop of the firmware. The role is fixed at process start:
//! a build constructs either a [`ReceiverLink`] or a [`TransmitterLink`] and
//! drives it one cycle at a time. Every non-init error is recovered at the
//! cycle boundary — the cycle reports what happened and the next cycle
//! starts from a clean state.

use crate::config::{CYCLE_INTERVAL_MS, RECEIVE_WAIT_TIMEOUT_MS, SENSOR_CRITICALITY};
use crate::link::aggregator::{Sensor, TelemetryAggregator};
use crate::link::driver::{Delay, RadioDriver};
use crate::link::session::RadioSession;
use crate::storage::{PersistenceSink, StorageDriver};
use crate::types::{Criticality, InitError, LinkConfig, LogRecord, RadioError, SensorId, StorageError};

use heapless::Vec;

/// What one link cycle did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A packet was received and durably recorded
    Received {
        /// Sequence number assigned to the packet
        sequence: u32,
        /// Payload length in bytes
        len: usize,
    },
    /// A telemetry payload was sent
    Transmitted {
        /// Payload length in bytes
        len: usize,
    },
    /// The radio side of the cycle failed; recovered next cycle
    RadioFault(RadioError),
    /// The packet arrived but could not be recorded; recovered next record
    StorageFault {
        /// Sequence number of the packet that was not recorded
        sequence: u32,
        /// Stage-tagged storage failure
        error: StorageError,
    },
}

#[cfg(feature = "embedded")]
impl defmt::Format for CycleOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Received { sequence, len } => {
                defmt::write!(f, "received #{=u32} ({=usize} bytes)", sequence, len);
            }
            Self::Transmitted { len } => defmt::write!(f, "transmitted {=usize} bytes", len),
            Self::RadioFault(e) => defmt::write!(f, "radio fault: {}", e),
            Self::StorageFault { sequence, error } => {
                defmt::write!(f, "storage fault on #{=u32}: {}", sequence, error);
            }
        }
    }
}

/// Ground-station cycle: listen, decode, persist
pub struct ReceiverLink<D: RadioDriver, S: StorageDriver, W: Delay> {
    session: RadioSession<D>,
    sink: PersistenceSink<S>,
    delay: W,
    interval_ms: u32,
    wait_timeout_ms: u32,
}

impl<D: RadioDriver, S: StorageDriver, W: Delay> ReceiverLink<D, S, W> {
    /// Build a receiver over an un-begun session and a persistence sink
    pub fn new(session: RadioSession<D>, sink: PersistenceSink<S>, delay: W) -> Self {
        Self {
            session,
            sink,
            delay,
            interval_ms: CYCLE_INTERVAL_MS,
            wait_timeout_ms: RECEIVE_WAIT_TIMEOUT_MS,
        }
    }

    /// Override the cycle interval and receive-wait timeout
    pub fn set_timing(&mut self, interval_ms: u32, wait_timeout_ms: u32) {
        self.interval_ms = interval_ms;
        self.wait_timeout_ms = wait_timeout_ms;
    }

    /// Access the session (state and sequence inspection)
    #[must_use]
    pub const fn session(&self) -> &RadioSession<D> {
        &self.session
    }

    /// Bring the radio up
    pub fn begin(&mut self, config: &LinkConfig) -> Result<(), InitError> {
        self.session.begin(config)
    }

    /// Run one receive cycle, then sleep the cycle interval.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.receive_once();
        self.delay.sleep_ms(self.interval_ms);
        outcome
    }

    fn receive_once(&mut self) -> CycleOutcome {
        if let Err(e) = self.session.start_receive() {
            return CycleOutcome::RadioFault(e);
        }
        if let Err(e) = self
            .session
            .await_completion(&mut self.delay, self.wait_timeout_ms)
        {
            return CycleOutcome::RadioFault(e);
        }
        let packet = match self.session.read_data() {
            Ok(packet) => packet,
            Err(e) => return CycleOutcome::RadioFault(e),
        };

        let record = LogRecord::from_packet(self.session.sequence(), &packet);
        match self.sink.append_record(&record) {
            Ok(()) => CycleOutcome::Received {
                sequence: record.sequence_number(),
                len: packet.len(),
            },
            Err(error) => CycleOutcome::StorageFault {
                sequence: record.sequence_number(),
                error,
            },
        }
    }
}

/// Flight-unit cycle: collect, transmit, report
pub struct TransmitterLink<D, P, I, E, W>
where
    D: RadioDriver,
    P: Sensor,
    I: Sensor,
    E: Sensor,
    W: Delay,
{
    session: RadioSession<D>,
    aggregator: TelemetryAggregator<P, I, E>,
    delay: W,
    interval_ms: u32,
}

impl<D, P, I, E, W> TransmitterLink<D, P, I, E, W>
where
    D: RadioDriver,
    P: Sensor,
    I: Sensor,
    E: Sensor,
    W: Delay,
{
    /// Build a transmitter over an un-begun session and an aggregator
    pub fn new(
        session: RadioSession<D>,
        aggregator: TelemetryAggregator<P, I, E>,
        delay: W,
    ) -> Self {
        Self {
            session,
            aggregator,
            delay,
            interval_ms: CYCLE_INTERVAL_MS,
        }
    }

    /// Override the cycle interval
    pub fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms;
    }

    /// Access the session (state inspection)
    #[must_use]
    pub const fn session(&self) -> &RadioSession<D> {
        &self.session
    }

    /// Bring sensors and radio up.
    ///
    /// Returns the sensors that failed to initialize. With the best-effort
    /// policy the link runs degraded and the caller reports the list; with
    /// the critical policy the first failed sensor aborts startup. The
    /// radio is always critical.
    pub fn begin(&mut self, config: &LinkConfig) -> Result<Vec<SensorId, 3>, InitError> {
        let failed = self.aggregator.begin_all();
        if SENSOR_CRITICALITY == Criticality::Critical {
            if let Some(&id) = failed.first() {
                return Err(InitError::Sensor(id));
            }
        }
        self.session.begin(config)?;
        Ok(failed)
    }

    /// Run one transmit cycle, then sleep the cycle interval.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let payload = self.aggregator.collect();
        let outcome = match self.session.transmit(&payload) {
            Ok(()) => CycleOutcome::Transmitted {
                len: payload.len(),
            },
            Err(e) => CycleOutcome::RadioFault(e),
        };
        self.delay.sleep_ms(self.interval_ms);
        outcome
    }
}
