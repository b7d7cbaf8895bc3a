//! LoRa Telemetry Link Firmware Library
//!
//! This library provides the core functionality for a battery-powered LoRa
//! telemetry link. One build of the firmware runs in one of two roles, fixed
//! at compile time: the flight **transmitter**, which aggregates sensor
//! readings into outbound packets, and the ground-station **receiver**, which
//! captures inbound packets and appends them to durable storage.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                         │
//! │  Link Runner  │  Radio Session  │  Persistence Sink          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  CAPABILITY SEAMS (traits)                   │
//! │  RadioDriver  │  StorageDriver  │  Sensor  │  Delay          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  SX127x (SPI)  │  GPS / IMU / ENV adapters  │  GPIO          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │           embassy-rs (async/await executor)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Explicit ownership**: one radio session owns one device handle;
//!   collaborators are passed in at construction, never reached as globals
//! - **Type-driven design**: typed errors and state machines enforce the
//!   session lifecycle
//! - **No unsafe in application code**: all unsafe isolated in HAL/FFI layers
//! - **Functional core, imperative shell**: the session, sink, and runner are
//!   portable logic driven through trait seams; hardware lives behind the
//!   `embedded` feature
//! - **Explicit error handling**: all fallible operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Safe abstractions over MCU peripherals (status LED, blocking time).
#[cfg(feature = "embedded")]
pub mod hal;

/// Peripheral Drivers
///
/// High-level drivers for external ICs (SX127x radio, sensor adapters).
#[cfg(feature = "embedded")]
pub mod drivers;

/// Radio Link Control
///
/// The session state machine, completion signal, telemetry aggregation,
/// and the top-level receive/transmit cycle.
pub mod link;

/// Received-Packet Persistence
///
/// Write-through append logging of received packets.
pub mod storage;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::link::session::RadioSession;
    pub use crate::link::signal::CompletionSignal;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
