//! Blocking Time Source
//!
//! Adapts the embassy time driver to the link's [`Delay`] seam for code
//! paths that pace themselves synchronously (the transmitter cycle).

use embassy_time::Duration;

use crate::link::driver::Delay;

/// Millisecond delay backed by the embassy time driver.
///
/// Blocks the executor for the duration, so it belongs only in roles whose
/// cycle has no concurrent task to starve. The receiver's completion wait
/// is paced with async timers in the binary instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockingDelay;

impl Delay for BlockingDelay {
    fn sleep_ms(&mut self, ms: u32) {
        embassy_time::block_for(Duration::from_millis(u64::from(ms)));
    }
}
