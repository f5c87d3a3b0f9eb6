//! Collaborator contracts: byte transport, SET pin, monotonic clock.

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::types::Baud;

/// Byte-level serial channel to the module. Reads never block.
pub trait Transport {
    /// (Re)open at `baud`. An already-open channel is replaced.
    fn open(&mut self, baud: Baud) -> Result<()>;
    fn close(&mut self);
    fn bytes_available(&mut self) -> Result<bool>;
    /// Next byte if one is buffered.
    fn read_byte(&mut self) -> Result<Option<u8>>;
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Output,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Digital output wired to the module's SET input. Implementations report
/// their own I/O failures; the driver treats pin writes as infallible.
pub trait ControlPin {
    fn set_direction(&mut self, dir: PinDirection);
    fn write_level(&mut self, level: Level);
}

pub trait Clock {
    /// Monotonic time since an arbitrary, fixed epoch.
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);

    fn elapsed_since(&self, start: Duration) -> Duration {
        self.now().saturating_sub(start)
    }
}

/// Wall clock backed by `Instant` and `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}
