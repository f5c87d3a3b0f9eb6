//! In-memory stand-in for an HC-12 module.
//!
//! [`SimModule`] is the serial side, [`SimPin`] the SET input, and both share
//! one module state. Time is virtual: [`SimClock::sleep`] advances it, and
//! reply bytes become readable once the clock reaches their arrival time.
//! The module only answers while SET is low and the host speed matches its
//! own, like the real part.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use crate::command::{AtCommand, format_command, parse_command};
use crate::error::{LinkError, Result};
use crate::hal::{Clock, ControlPin, Level, PinDirection, Transport};
use crate::types::{Baud, Channel};

pub const SIM_FIRMWARE: &str = "www.hc01.com HC-12_V2.6";

#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<Duration>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[derive(Debug)]
struct ModuleState {
    baud: Baud,
    channel: Channel,
    firmware: String,
    level: Level,
    direction: Option<PinDirection>,
    asleep: bool,
    sleep_pending: bool,
    silent: bool,
    reply_delay: Duration,
    byte_interval: Duration,
    host_baud: Option<Baud>,
    rx: VecDeque<(Duration, u8)>,
    overrides: HashMap<String, String>,
    write_faults: Vec<Baud>,
    sent: Vec<(Baud, String)>,
    pin_writes: Vec<Level>,
}

/// Serial side of the simulated module. Clones share state.
#[derive(Debug, Clone)]
pub struct SimModule {
    state: Rc<RefCell<ModuleState>>,
    clock: SimClock,
}

/// SET input of a [`SimModule`].
#[derive(Debug, Clone)]
pub struct SimPin {
    state: Rc<RefCell<ModuleState>>,
}

impl SimModule {
    pub fn new(baud: Baud, channel: Channel, clock: SimClock) -> Self {
        let state = ModuleState {
            baud,
            channel,
            firmware: SIM_FIRMWARE.to_string(),
            level: Level::High,
            direction: None,
            asleep: false,
            sleep_pending: false,
            silent: false,
            reply_delay: Duration::from_millis(2),
            byte_interval: Duration::ZERO,
            host_baud: None,
            rx: VecDeque::new(),
            overrides: HashMap::new(),
            write_faults: Vec::new(),
            sent: Vec::new(),
            pin_writes: Vec::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            clock,
        }
    }

    pub fn pin(&self) -> SimPin {
        SimPin {
            state: Rc::clone(&self.state),
        }
    }

    /* ---------- fault injection ---------- */

    /// Stop answering commands entirely.
    pub fn set_silent(&self, silent: bool) {
        self.state.borrow_mut().silent = silent;
    }

    /// Answer `command` with `reply` instead of the normal echo, without
    /// applying the command.
    pub fn set_reply_override(&self, command: &AtCommand, reply: &str) {
        self.state
            .borrow_mut()
            .overrides
            .insert(format_command(command), reply.to_string());
    }

    /// Fail every write made while the host is open at `baud`.
    pub fn fail_writes_at(&self, baud: Baud) {
        self.state.borrow_mut().write_faults.push(baud);
    }

    pub fn set_reply_delay(&self, d: Duration) {
        self.state.borrow_mut().reply_delay = d;
    }

    pub fn set_byte_interval(&self, d: Duration) {
        self.state.borrow_mut().byte_interval = d;
    }

    pub fn set_firmware(&self, fw: &str) {
        self.state.borrow_mut().firmware = fw.to_string();
    }

    /// Queue raw bytes on the host's receive side, starting `delay` from now.
    pub fn inject_at(&self, delay: Duration, bytes: &[u8]) {
        let start = self.clock.now() + delay;
        let mut st = self.state.borrow_mut();
        let interval = st.byte_interval;
        for (i, &b) in bytes.iter().enumerate() {
            st.rx.push_back((start + interval * i as u32, b));
        }
    }

    /* ---------- inspection ---------- */

    pub fn baud(&self) -> Baud {
        self.state.borrow().baud
    }

    pub fn channel(&self) -> Channel {
        self.state.borrow().channel
    }

    pub fn is_asleep(&self) -> bool {
        self.state.borrow().asleep
    }

    pub fn host_baud(&self) -> Option<Baud> {
        self.state.borrow().host_baud
    }

    /// Every write seen, with the host speed it was sent at.
    pub fn sent(&self) -> Vec<(Baud, String)> {
        self.state.borrow().sent.clone()
    }

    pub fn sent_commands(&self) -> Vec<String> {
        self.state.borrow().sent.iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn clear_log(&self) {
        let mut st = self.state.borrow_mut();
        st.sent.clear();
        st.pin_writes.clear();
    }

    fn reply_to(&self, text: &str) -> Option<String> {
        let mut st = self.state.borrow_mut();
        if st.silent {
            return None;
        }
        if let Some(r) = st.overrides.get(text) {
            return Some(r.clone());
        }
        let reply = match parse_command(text) {
            Ok(AtCommand::Test) => "OK".to_string(),
            Ok(AtCommand::SetBaud(b)) => {
                // echo still goes out at the old speed
                st.baud = b;
                format!("OK+B{}", b.as_u32())
            }
            Ok(AtCommand::SetChannel(ch)) => {
                st.channel = ch;
                format!("OK+C{}", ch.wire())
            }
            Ok(AtCommand::ReadChannel) => format!("OK+RC{}", st.channel.wire()),
            Ok(AtCommand::Version) => st.firmware.clone(),
            Ok(AtCommand::Sleep) => {
                st.sleep_pending = true;
                "OK+SLEEP".to_string()
            }
            Err(_) => "ERROR".to_string(),
        };
        Some(reply)
    }

    fn host_baud_or_err(&self) -> Result<Baud> {
        self.state
            .borrow()
            .host_baud
            .ok_or_else(|| LinkError::Transport("sim port not open".into()))
    }
}

impl Transport for SimModule {
    fn open(&mut self, baud: Baud) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.host_baud = Some(baud);
        st.rx.clear();
        Ok(())
    }

    fn close(&mut self) {
        let mut st = self.state.borrow_mut();
        st.host_baud = None;
        st.rx.clear();
    }

    fn bytes_available(&mut self) -> Result<bool> {
        self.host_baud_or_err()?;
        let now = self.clock.now();
        Ok(self
            .state
            .borrow()
            .rx
            .front()
            .is_some_and(|(at, _)| *at <= now))
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if !self.bytes_available()? {
            return Ok(None);
        }
        Ok(self.state.borrow_mut().rx.pop_front().map(|(_, b)| b))
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let host = self.host_baud_or_err()?;
        if self.state.borrow().write_faults.contains(&host) {
            return Err(LinkError::Transport(format!("sim write failed at {host}")));
        }
        let text = String::from_utf8_lossy(data).into_owned();
        let (module_baud, level) = {
            let mut st = self.state.borrow_mut();
            st.sent.push((host, text.clone()));
            (st.baud, st.level)
        };
        trace!(%host, %text, "sim rx");

        if level == Level::High {
            // payload traffic wakes a sleeping module
            self.state.borrow_mut().asleep = false;
            return Ok(());
        }
        if host != module_baud {
            return Ok(());
        }
        if let Some(reply) = self.reply_to(&text) {
            let delay = self.state.borrow().reply_delay;
            self.inject_at(delay, format!("{reply}\r\n").as_bytes());
        }
        Ok(())
    }
}

impl SimPin {
    pub fn level(&self) -> Level {
        self.state.borrow().level
    }

    pub fn direction(&self) -> Option<PinDirection> {
        self.state.borrow().direction
    }

    pub fn writes(&self) -> Vec<Level> {
        self.state.borrow().pin_writes.clone()
    }
}

impl ControlPin for SimPin {
    fn set_direction(&mut self, dir: PinDirection) {
        self.state.borrow_mut().direction = Some(dir);
    }

    fn write_level(&mut self, level: Level) {
        let mut st = self.state.borrow_mut();
        st.level = level;
        st.pin_writes.push(level);
        match level {
            Level::Low => st.asleep = false,
            Level::High => {
                if st.sleep_pending {
                    st.sleep_pending = false;
                    st.asleep = true;
                }
            }
        }
    }
}
