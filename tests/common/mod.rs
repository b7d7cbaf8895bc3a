//! Shared fakes for the host test suites
//!
//! Each fake keeps its observable state behind `Rc<RefCell<..>>` so a test
//! can hand the fake to the component under test (which takes ownership)
//! and still assert on calls and captured data afterwards through a clone.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use lora_telemetry::link::aggregator::{Sensor, SensorReading};
use lora_telemetry::link::driver::{codes, Delay, RadioDriver};
use lora_telemetry::link::signal::CompletionSignal;
use lora_telemetry::storage::StorageDriver;
use lora_telemetry::types::LinkConfig;

// ============================================================================
// Fake radio
// ============================================================================

/// Scripted behavior and captured calls of the fake radio
pub struct RadioInner {
    /// Code `begin` returns after parameter validation passes
    pub begin_code: i16,
    /// Code `start_receive` returns
    pub start_code: i16,
    /// Code `read_data` returns
    pub read_code: i16,
    /// Code `transmit` returns
    pub transmit_code: i16,
    /// Bytes the device buffer holds for the next read
    pub rx_payload: Vec<u8>,
    /// Device-reported packet length, if different from the payload
    pub reported_length: Option<usize>,
    /// Raise the bound signal as soon as a receive is armed
    pub raise_on_start: bool,
    /// Signal registered through `bind_completion`
    pub bound: Option<&'static CompletionSignal>,
    pub begin_calls: u32,
    pub start_calls: u32,
    pub read_calls: u32,
    /// Payloads passed to `transmit`
    pub transmitted: Vec<Vec<u8>>,
}

impl Default for RadioInner {
    fn default() -> Self {
        Self {
            begin_code: codes::OK,
            start_code: codes::OK,
            read_code: codes::OK,
            transmit_code: codes::OK,
            rx_payload: Vec::new(),
            reported_length: None,
            raise_on_start: false,
            bound: None,
            begin_calls: 0,
            start_calls: 0,
            read_calls: 0,
            transmitted: Vec::new(),
        }
    }
}

/// Fake radio collaborator
///
/// Validates spreading factor and coding rate at `begin` the way the real
/// device does, so invalid configurations are rejected with the matching
/// code.
#[derive(Clone, Default)]
pub struct FakeRadio {
    pub inner: Rc<RefCell<RadioInner>>,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RadioDriver for FakeRadio {
    fn begin(&mut self, config: &LinkConfig) -> i16 {
        let mut inner = self.inner.borrow_mut();
        inner.begin_calls += 1;
        if !(7..=12).contains(&config.spreading_factor) {
            return codes::INVALID_SPREADING_FACTOR;
        }
        if !(5..=8).contains(&config.coding_rate) {
            return codes::INVALID_CODING_RATE;
        }
        inner.begin_code
    }

    fn bind_completion(&mut self, signal: &'static CompletionSignal) {
        self.inner.borrow_mut().bound = Some(signal);
    }

    fn start_receive(&mut self) -> i16 {
        let mut inner = self.inner.borrow_mut();
        inner.start_calls += 1;
        if inner.start_code == codes::OK && inner.raise_on_start {
            if let Some(signal) = inner.bound {
                signal.raise();
            }
        }
        inner.start_code
    }

    fn packet_length(&mut self) -> usize {
        let inner = self.inner.borrow();
        inner.reported_length.unwrap_or(inner.rx_payload.len())
    }

    fn read_data(&mut self, buf: &mut [u8]) -> i16 {
        let mut inner = self.inner.borrow_mut();
        inner.read_calls += 1;
        let take = buf.len().min(inner.rx_payload.len());
        buf[..take].copy_from_slice(&inner.rx_payload[..take]);
        inner.read_code
    }

    fn transmit(&mut self, payload: &[u8]) -> i16 {
        let mut inner = self.inner.borrow_mut();
        inner.transmitted.push(payload.to_vec());
        inner.transmit_code
    }
}

// ============================================================================
// Fake storage
// ============================================================================

/// Scripted behavior and captured calls of the fake storage volume
#[derive(Default)]
pub struct StorageInner {
    /// Accumulated file contents
    pub file: String,
    /// Whether the volume is currently mounted
    pub mounted: bool,
    pub mount_calls: u32,
    pub open_calls: u32,
    pub write_calls: u32,
    pub close_calls: u32,
    pub unmount_calls: u32,
    /// Fail the next mount with this code
    pub fail_mount: Option<i16>,
    /// Fail the next open with this code
    pub fail_open: Option<i16>,
    /// Fail the Nth write call (1-based) with this code
    pub fail_write_on_call: Option<(u32, i16)>,
    /// On the Nth write call (1-based), persist only this many bytes
    pub short_write_on_call: Option<(u32, usize)>,
    /// Fail the next close with this code
    pub fail_close: Option<i16>,
    /// Fail the next unmount with this code
    pub fail_unmount: Option<i16>,
}

/// Fake storage collaborator
///
/// Asserts the mount/open/write/close/unmount ordering invariants: every
/// file operation requires a mounted volume, and mounts never nest.
#[derive(Clone, Default)]
pub struct FakeStorage {
    pub inner: Rc<RefCell<StorageInner>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageDriver for FakeStorage {
    type Handle = ();

    fn mount(&mut self, _volume: &str) -> Result<(), i16> {
        let mut inner = self.inner.borrow_mut();
        inner.mount_calls += 1;
        if let Some(code) = inner.fail_mount.take() {
            return Err(code);
        }
        assert!(!inner.mounted, "mount while already mounted");
        inner.mounted = true;
        Ok(())
    }

    fn open_append(&mut self, _path: &str) -> Result<(), i16> {
        let mut inner = self.inner.borrow_mut();
        inner.open_calls += 1;
        assert!(inner.mounted, "open without mount");
        if let Some(code) = inner.fail_open.take() {
            return Err(code);
        }
        Ok(())
    }

    fn write(&mut self, _handle: &mut (), text: &str) -> Result<usize, i16> {
        let mut inner = self.inner.borrow_mut();
        inner.write_calls += 1;
        assert!(inner.mounted, "write without mount");

        let call = inner.write_calls;
        if let Some((n, code)) = inner.fail_write_on_call {
            if call == n {
                return Err(code);
            }
        }
        if let Some((n, keep)) = inner.short_write_on_call {
            if call == n {
                let keep = keep.min(text.len());
                inner.file.push_str(&text[..keep]);
                return Ok(keep);
            }
        }
        inner.file.push_str(text);
        Ok(text.len())
    }

    fn close(&mut self, _handle: ()) -> Result<(), i16> {
        let mut inner = self.inner.borrow_mut();
        inner.close_calls += 1;
        assert!(inner.mounted, "close without mount");
        if let Some(code) = inner.fail_close.take() {
            return Err(code);
        }
        Ok(())
    }

    fn unmount(&mut self, _volume: &str) -> Result<(), i16> {
        let mut inner = self.inner.borrow_mut();
        inner.unmount_calls += 1;
        assert!(inner.mounted, "unmount without mount");
        inner.mounted = false;
        if let Some(code) = inner.fail_unmount.take() {
            return Err(code);
        }
        Ok(())
    }
}

// ============================================================================
// Stub sensor
// ============================================================================

/// Sensor stub returning a fixed reading
pub struct StubSensor {
    pub reading: &'static str,
    pub begin_ok: bool,
}

impl StubSensor {
    pub fn reporting(reading: &'static str) -> Self {
        Self {
            reading,
            begin_ok: true,
        }
    }

    pub fn dead(reading: &'static str) -> Self {
        Self {
            reading,
            begin_ok: false,
        }
    }
}

impl Sensor for StubSensor {
    fn begin(&mut self) -> bool {
        self.begin_ok
    }

    fn read_data(&mut self) -> SensorReading {
        let mut reading = SensorReading::new();
        let _ = reading.push_str(self.reading);
        reading
    }
}

// ============================================================================
// Fake delay
// ============================================================================

/// Captured sleeps and optional scripted completion
#[derive(Default)]
pub struct DelayInner {
    /// Every sleep duration requested, in order
    pub slept: Vec<u32>,
    /// Raise the signal when the Nth sleep (1-based) happens
    pub raise_after: Option<(usize, &'static CompletionSignal)>,
}

/// Fake delay that records sleeps and can inject a synthetic completion
/// partway through a bounded wait
#[derive(Clone, Default)]
pub struct FakeDelay {
    pub inner: Rc<RefCell<DelayInner>>,
}

impl FakeDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `signal` when the Nth sleep (1-based) happens
    pub fn raise_on_sleep(&self, n: usize, signal: &'static CompletionSignal) {
        self.inner.borrow_mut().raise_after = Some((n, signal));
    }

    pub fn total_slept_ms(&self) -> u64 {
        self.inner.borrow().slept.iter().map(|&ms| u64::from(ms)).sum()
    }
}

impl Delay for FakeDelay {
    fn sleep_ms(&mut self, ms: u32) {
        let mut inner = self.inner.borrow_mut();
        inner.slept.push(ms);
        if let Some((n, signal)) = inner.raise_after {
            if inner.slept.len() == n {
                signal.raise();
            }
        }
    }
}
