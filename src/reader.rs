//! Reply framing.
//!
//! The module's replies carry no terminator and no length, so a reply ends
//! when the line stays quiet for `byte_gap` after the last byte.

use std::fmt;
use std::time::Duration;

use tracing::trace;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::hal::{Clock, Transport};

/// Upper bound on bytes discarded by one [`drain_input`] call.
pub const MAX_DRAIN: usize = 1024;

/// One framed reply, trimmed. Empty when nothing arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response(String);

impl Response {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Response {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Poll until a byte is available or `window` has passed since the call.
fn wait_for_byte<T: Transport, C: Clock>(
    transport: &mut T,
    clock: &C,
    window: Duration,
    poll: Duration,
) -> Result<bool> {
    let start = clock.now();
    loop {
        if transport.bytes_available()? {
            return Ok(true);
        }
        let elapsed = clock.elapsed_since(start);
        if elapsed >= window {
            return Ok(false);
        }
        clock.sleep(poll.min(window - elapsed));
    }
}

/// Wait up to `timeout` for a reply to start, then collect bytes until the
/// line has been quiet for `cfg.byte_gap`.
pub fn read_response<T: Transport, C: Clock>(
    transport: &mut T,
    clock: &C,
    cfg: &LinkConfig,
    timeout: Duration,
) -> Result<Response> {
    if !wait_for_byte(transport, clock, timeout, cfg.poll_interval)? {
        trace!(?timeout, "no reply");
        return Ok(Response::default());
    }

    let mut raw = String::new();
    loop {
        if let Some(b) = transport.read_byte()? {
            raw.push(b as char);
        }
        if !wait_for_byte(transport, clock, cfg.byte_gap, cfg.poll_interval)? {
            break;
        }
    }

    let response = Response::new(&raw);
    trace!(reply = %response, "framed reply");
    Ok(response)
}

/// Discard stale input. Returns the number of bytes dropped.
pub fn drain_input<T: Transport, C: Clock>(
    transport: &mut T,
    clock: &C,
    cfg: &LinkConfig,
) -> Result<usize> {
    let mut dropped = 0;
    while dropped < MAX_DRAIN && transport.bytes_available()? {
        if transport.read_byte()?.is_some() {
            dropped += 1;
        }
        if !wait_for_byte(transport, clock, cfg.byte_gap, cfg.poll_interval)? {
            break;
        }
    }
    if dropped > 0 {
        trace!(dropped, "drained stale input");
    }
    Ok(dropped)
}
