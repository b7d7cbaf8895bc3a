//! Telemetry Aggregation
//!
//! Polls the three sensor collaborators each cycle and joins their readings
//! into one delimited payload for transmission.

use heapless::{String, Vec};

use crate::config::{SENSOR_READING_CAPACITY, TELEMETRY_PAYLOAD_CAPACITY};
use crate::types::SensorId;

/// One formatted sensor reading
pub type SensorReading = String<SENSOR_READING_CAPACITY>;

/// One aggregated telemetry payload
pub type TelemetryPayload = String<TELEMETRY_PAYLOAD_CAPACITY>;

/// Sensor capability consumed by the aggregator
///
/// Readings are assumed non-blocking or already buffered; `read_data` is
/// polled once per cycle with no retry and no freshness check.
pub trait Sensor {
    /// Bring the sensor up. Returns `false` if it did not respond.
    fn begin(&mut self) -> bool;

    /// Current reading as text. A stale or empty reading passes through
    /// verbatim.
    fn read_data(&mut self) -> SensorReading;
}

/// Joins position, inertial, and environmental readings with `;`
///
/// Field order is fixed; a receiver splits on the delimiter and indexes by
/// position. The 1 Hz transmit cadence is expected to exceed every sensor's
/// refresh latency, so no staleness tracking is done here.
pub struct TelemetryAggregator<P, I, E> {
    position: P,
    inertial: I,
    environmental: E,
}

impl<P: Sensor, I: Sensor, E: Sensor> TelemetryAggregator<P, I, E> {
    /// Create an aggregator over the three sensors
    pub const fn new(position: P, inertial: I, environmental: E) -> Self {
        Self {
            position,
            inertial,
            environmental,
        }
    }

    /// Initialize every sensor, returning the ones that failed.
    ///
    /// The caller applies the configured criticality policy; the aggregator
    /// itself keeps running with whatever came up.
    pub fn begin_all(&mut self) -> Vec<SensorId, 3> {
        let mut failed = Vec::new();
        if !self.position.begin() {
            let _ = failed.push(SensorId::Position);
        }
        if !self.inertial.begin() {
            let _ = failed.push(SensorId::Inertial);
        }
        if !self.environmental.begin() {
            let _ = failed.push(SensorId::Environmental);
        }
        failed
    }

    /// Poll all three sensors and join the readings.
    ///
    /// The payload capacity covers three full readings plus delimiters, so
    /// the pushes cannot fail.
    pub fn collect(&mut self) -> TelemetryPayload {
        let mut payload = TelemetryPayload::new();
        let _ = payload.push_str(&self.position.read_data());
        let _ = payload.push(';');
        let _ = payload.push_str(&self.inertial.read_data());
        let _ = payload.push(';');
        let _ = payload.push_str(&self.environmental.read_data());
        payload
    }
}
