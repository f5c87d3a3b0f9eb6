//! Device session: the transport, the SET pin and what has been negotiated.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::command::{
    AtCommand, READ_CHANNEL_PREFIX, expected_reply, format_command, parse_read_channel,
};
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::hal::{Clock, ControlPin, Transport};
use crate::mode::ModeController;
use crate::negotiate::NegotiationState;
use crate::reader::{Response, drain_input, read_response};
use crate::types::{Baud, Channel, Mode};

/// One HC-12 module. Exclusively owns its transport and SET pin; a single
/// caller drives it at a time.
#[derive(Debug)]
pub struct Hc12<T, P, C> {
    pub(crate) transport: T,
    pub(crate) mode: ModeController<P>,
    pub(crate) clock: C,
    pub(crate) config: LinkConfig,
    pub(crate) baud: Option<Baud>,
    pub(crate) channel: Option<Channel>,
    pub(crate) asleep: bool,
    pub(crate) state: NegotiationState,
}

/// Proof that the session is in configuration mode. Only obtainable from
/// [`Hc12::enter_command_mode`] or [`Hc12::command_mode`], so everything
/// issued through it skips the runtime mode check.
#[derive(Debug)]
pub struct CommandMode<'s, T, P, C> {
    pub(crate) session: &'s mut Hc12<T, P, C>,
}

impl<T: Transport, P: ControlPin, C: Clock> Hc12<T, P, C> {
    pub fn new(transport: T, pin: P, clock: C, config: LinkConfig) -> Self {
        Self {
            transport,
            mode: ModeController::new(pin),
            clock,
            config,
            baud: None,
            channel: None,
            asleep: false,
            state: NegotiationState::Idle,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn baud(&self) -> Option<Baud> {
        self.baud
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn response_timeout(&self) -> Duration {
        self.config.response_timeout
    }

    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.config.response_timeout = timeout;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pin(&self) -> &P {
        self.mode.pin()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Make the SET pin an output. [`begin`](Self::begin) does this itself.
    pub fn claim_pin(&mut self) {
        self.mode.claim();
    }

    pub fn set_mode(&mut self, target: Mode) {
        self.mode.set_mode(target, &self.clock, &self.config);
    }

    /// Force configuration mode and hand out the command token.
    pub fn enter_command_mode(&mut self) -> CommandMode<'_, T, P, C> {
        self.set_mode(Mode::Configuration);
        CommandMode { session: self }
    }

    /// Command token for a session already in configuration mode.
    pub fn command_mode(&mut self) -> Result<CommandMode<'_, T, P, C>> {
        match self.mode.mode() {
            Mode::Configuration => Ok(CommandMode { session: self }),
            other => {
                warn!(mode = %other, "set configuration mode before issuing AT commands");
                Err(LinkError::WrongMode(other))
            }
        }
    }

    pub fn send_and_expect(&mut self, command: &str, expected: &str) -> Result<bool> {
        self.command_mode()?.send_and_expect(command, expected)
    }

    pub fn test_at(&mut self) -> Result<bool> {
        self.command_mode()?.test_at()
    }

    pub fn detect_channel(&mut self) -> Result<Channel> {
        self.command_mode()?.read_channel()
    }

    pub fn firmware_version(&mut self) -> Result<String> {
        self.command_mode()?.firmware_version()
    }

    /// Send `AT+SLEEP`. The session ends up in transmission mode whether or
    /// not the module acknowledged.
    pub fn sleep(&mut self) -> Result<()> {
        let result = self.enter_command_mode().expect(&AtCommand::Sleep).map(|_| ());
        match &result {
            Ok(()) => {
                self.asleep = true;
                info!("module is now asleep");
            }
            Err(e) => warn!(error = %e, "failed to put module to sleep"),
        }
        self.set_mode(Mode::Transmission);
        result
    }

    /// Traffic on the data line wakes the module, so nothing is sent here.
    pub fn wake(&mut self) {
        self.asleep = false;
        self.set_mode(Mode::Transmission);
        info!("module is now awake");
    }

    /// Close the transport and return to the un-negotiated state.
    pub fn end(&mut self) {
        self.transport.close();
        if self.asleep {
            self.wake();
        }
        self.set_mode(Mode::Configuration);
        self.mode.release();
        self.baud = None;
        self.channel = None;
        self.state = NegotiationState::Idle;
        info!("session closed");
    }
}

impl<T: Transport, P: ControlPin, C: Clock> CommandMode<'_, T, P, C> {
    fn exchange(&mut self, command: &str, settle: Duration) -> Result<Response> {
        let s = &mut *self.session;
        drain_input(&mut s.transport, &s.clock, &s.config)?;
        debug!(command, "sending");
        s.transport.write_bytes(command.as_bytes())?;
        s.clock.sleep(settle);
        read_response(&mut s.transport, &s.clock, &s.config, s.config.response_timeout)
    }

    /// Send raw command text and report whether the reply matched.
    pub fn send_and_expect(&mut self, command: &str, expected: &str) -> Result<bool> {
        let response = self.exchange(command, Duration::ZERO)?;
        let ok = response == expected;
        if !ok {
            debug!(command, expected, got = %response, "reply mismatch");
        }
        Ok(ok)
    }

    pub fn send(&mut self, cmd: &AtCommand) -> Result<Response> {
        let settle = match cmd {
            AtCommand::SetBaud(_) => self.session.config.baud_change_settle,
            _ => Duration::ZERO,
        };
        self.exchange(&format_command(cmd), settle)
    }

    /// Send `cmd` and require its echo. Commands without a fixed echo only
    /// require a non-empty reply.
    pub fn expect(&mut self, cmd: &AtCommand) -> Result<Response> {
        let response = self.send(cmd)?;
        if response.is_empty() {
            return Err(LinkError::NoResponse);
        }
        match expected_reply(cmd) {
            Some(expected) if response != expected.as_str() => Err(LinkError::UnexpectedResponse {
                expected,
                got: response.as_str().to_string(),
            }),
            _ => Ok(response),
        }
    }

    pub fn test_at(&mut self) -> Result<bool> {
        let ok = self.send(&AtCommand::Test)? == "OK";
        if ok {
            debug!("OK response received");
        }
        Ok(ok)
    }

    pub fn read_channel(&mut self) -> Result<Channel> {
        let response = self.expect(&AtCommand::ReadChannel)?;
        match parse_read_channel(response.as_str()) {
            Ok(ch) => {
                debug!(channel = %ch, "channel detected");
                Ok(ch)
            }
            Err(e) => {
                warn!(error = %e, "failed checking device channel");
                Err(LinkError::UnexpectedResponse {
                    expected: format!("{READ_CHANNEL_PREFIX}<nnn>"),
                    got: response.as_str().to_string(),
                })
            }
        }
    }

    /// Raw firmware string; empty if the module stayed silent.
    pub fn firmware_version(&mut self) -> Result<String> {
        Ok(self.send(&AtCommand::Version)?.as_str().to_string())
    }

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }
}
