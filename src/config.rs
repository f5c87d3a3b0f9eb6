use std::time::Duration;

use crate::types::Mode;

/// Timing knobs for the mode pin and the response reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Wait for the first reply byte before giving up.
    pub response_timeout: Duration,
    /// Quiet gap that ends a reply.
    pub byte_gap: Duration,
    /// Granularity of the busy-wait loops.
    pub poll_interval: Duration,
    pub config_settle: Duration,
    pub transmission_settle: Duration,
    /// Pause after closing the port, before each probe candidate.
    pub probe_settle: Duration,
    /// Pause between sending `AT+B...` and reading its echo.
    pub baud_change_settle: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(80),
            byte_gap: Duration::from_micros(5_120),
            poll_interval: Duration::from_millis(1),
            config_settle: Duration::from_millis(40),
            transmission_settle: Duration::from_millis(80),
            probe_settle: Duration::from_millis(40),
            baud_change_settle: Duration::from_millis(40),
        }
    }
}

impl LinkConfig {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_byte_gap(mut self, gap: Duration) -> Self {
        self.byte_gap = gap;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        // zero would spin forever against a virtual clock
        self.poll_interval = interval.max(Duration::from_micros(1));
        self
    }

    pub fn settle_for(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Configuration => self.config_settle,
            Mode::Transmission => self.transmission_settle,
        }
    }
}
