//! Speed detection and convergence of speed and channel.
//!
//! `begin` walks `Idle -> ProbingSpeed -> SpeedFound -> ConvergingSpeed ->
//! ConvergingChannel -> Converged`, or lands in `Aborted` after tearing the
//! session down.

use std::fmt;

use tracing::{debug, info, warn};

use crate::command::AtCommand;
use crate::error::{LinkError, Result};
use crate::hal::{Clock, ControlPin, Transport};
use crate::session::{CommandMode, Hc12};
use crate::types::{Baud, Channel, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    ProbingSpeed,
    SpeedFound,
    ConvergingSpeed,
    ConvergingChannel,
    Converged,
    Aborted,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<T: Transport, P: ControlPin, C: Clock> CommandMode<'_, T, P, C> {
    /// Try `AT` at every supported speed, lowest first. The transport is
    /// left open at the detected speed.
    ///
    /// Whatever speed was recorded before is forgotten, even if nothing
    /// answers.
    pub fn detect_baud(&mut self) -> Result<Baud> {
        self.session.baud = None;
        self.session.transport.close();

        for baud in Baud::ALL {
            let s = &mut *self.session;
            s.clock.sleep(s.config.probe_settle);
            if let Err(e) = s.transport.open(baud) {
                warn!(%baud, error = %e, "cannot open transport, skipping candidate");
                continue;
            }
            debug!(%baud, "testing response");

            let alive = self.test_at();
            self.session.transport.close();
            let alive = match alive {
                Ok(alive) => alive,
                Err(e) => {
                    warn!(%baud, error = %e, "transport failed during test, skipping candidate");
                    continue;
                }
            };
            if alive {
                info!(%baud, "current baud rate found");
                self.session.transport.open(baud)?;
                self.session.baud = Some(baud);
                return Ok(baud);
            }
        }

        warn!("baud rate not found, no response on any candidate");
        Err(LinkError::SpeedNotDetected)
    }

    /// Switch the module to `target` unless it is already there.
    pub fn converge_baud(&mut self, target: Baud) -> Result<()> {
        if self.session.baud == Some(target) {
            debug!(%target, "baud rate not changed, already the same");
            return Ok(());
        }

        if let Err(e) = self.expect(&AtCommand::SetBaud(target)) {
            warn!(%target, error = %e, "baud rate change failed");
            return Err(e);
        }

        let s = &mut *self.session;
        s.baud = Some(target);
        s.transport.close();
        s.transport.open(target)?;
        // the change leaves the module's mode ambiguous
        s.set_mode(Mode::Configuration);
        info!(%target, "baud rate changed");
        Ok(())
    }

    /// Switch the module to `target` unless it is already there.
    pub fn converge_channel(&mut self, target: Channel) -> Result<()> {
        if self.session.channel == Some(target) {
            debug!(%target, "channel not changed, already the same");
            return Ok(());
        }

        if let Err(e) = self.expect(&AtCommand::SetChannel(target)) {
            warn!(%target, error = %e, "channel change failed");
            return Err(e);
        }

        let s = &mut *self.session;
        s.channel = Some(target);
        s.set_mode(Mode::Configuration);
        info!(%target, "channel changed");
        Ok(())
    }
}

impl<T: Transport, P: ControlPin, C: Clock> Hc12<T, P, C> {
    pub fn detect_baud(&mut self) -> Result<Baud> {
        self.command_mode()?.detect_baud()
    }

    pub fn change_baud(&mut self, baud: u32) -> Result<()> {
        let target = Baud::try_from(baud)?;
        self.command_mode()?.converge_baud(target)
    }

    pub fn change_channel(&mut self, channel: u8) -> Result<()> {
        let target = Channel::new(channel)?;
        self.command_mode()?.converge_channel(target)
    }

    /// Bring the module to `baud`/`channel` from whatever it is set to now and
    /// leave it in transmission mode. On failure the session is torn down.
    pub fn begin(&mut self, baud: u32, channel: u8) -> Result<()> {
        let baud = Baud::try_from(baud)?;
        let channel = Channel::new(channel)?;

        match self.negotiate(baud, channel) {
            Ok(()) => {
                info!(%baud, %channel, "begin sequence successful");
                Ok(())
            }
            Err(e) => {
                warn!(state = %self.state, error = %e, "negotiation aborted");
                self.end();
                self.transition(NegotiationState::Aborted);
                Err(e)
            }
        }
    }

    fn negotiate(&mut self, baud: Baud, channel: Channel) -> Result<()> {
        self.claim_pin();

        self.transition(NegotiationState::ProbingSpeed);
        let mut cmd = self.enter_command_mode();
        cmd.detect_baud()?;
        cmd.session.transition(NegotiationState::SpeedFound);

        cmd.session.transition(NegotiationState::ConvergingSpeed);
        cmd.converge_baud(baud)?;

        cmd.session.transition(NegotiationState::ConvergingChannel);
        // unreadable channel counts as unknown and forces the change command
        let current = match cmd.read_channel() {
            Ok(ch) => Some(ch),
            Err(e) => {
                debug!(error = %e, "current channel unknown");
                None
            }
        };
        cmd.session.channel = current;
        cmd.converge_channel(channel)?;

        self.set_mode(Mode::Transmission);
        self.transition(NegotiationState::Converged);
        Ok(())
    }

    pub(crate) fn transition(&mut self, next: NegotiationState) {
        debug!(from = %self.state, to = %next, "negotiation");
        self.state = next;
    }
}
