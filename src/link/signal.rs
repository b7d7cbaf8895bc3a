//! Operation-Complete Signal
//!
//! Bridges the radio's hardware completion callback to the cooperative main
//! loop. One producer (the interrupt context) raises the flag; one consumer
//! (the polling main flow) consumes it. There is no other access path.

use core::sync::atomic::{AtomicBool, Ordering};

/// Interrupt-safe completion flag
///
/// A single boolean cell with atomic access. The flag only ever transitions
/// false→true from the callback side and true→false from the consumer side;
/// atomics are required because the two sides run in genuinely concurrent
/// contexts even on one core.
///
/// Const-constructible so instances can live in a `static` and be handed to
/// an interrupt handler by reference:
///
/// ```
/// use lora_telemetry::link::signal::CompletionSignal;
///
/// static RX_DONE: CompletionSignal = CompletionSignal::new();
///
/// RX_DONE.raise();
/// assert!(RX_DONE.poll_and_consume());
/// assert!(!RX_DONE.poll_and_consume());
/// ```
#[derive(Debug)]
pub struct CompletionSignal {
    pending: AtomicBool,
}

impl CompletionSignal {
    /// Create a new signal with nothing pending
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Mark the pending operation complete.
    ///
    /// Callable only from the completion callback (interrupt context).
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Read and clear the flag in one step, returning the pre-reset value.
    ///
    /// Callable only from the main loop. A raised flag is observed exactly
    /// once.
    #[must_use]
    pub fn poll_and_consume(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Clear the flag before arming a new operation.
    ///
    /// A stale completion from a prior cycle must not be mistaken for the
    /// one being started.
    pub fn reset_before_operation(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for CompletionSignal {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "CompletionSignal(pending={=bool})",
            self.pending.load(Ordering::Relaxed)
        );
    }
}
