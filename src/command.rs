//! AT command wire text.
//!
//! Commands go out as bare ASCII with no line terminator; the module answers
//! with an echo such as `OK+B9600`. `format_command` and `parse_command` are
//! inverse over every [`AtCommand`].

use thiserror::Error;

use crate::types::{Baud, Channel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand {
    /// Liveness probe.
    Test,
    SetBaud(Baud),
    SetChannel(Channel),
    ReadChannel,
    Version,
    Sleep,
}

pub const READ_CHANNEL_PREFIX: &str = "OK+RC";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("not an AT command: {0}")]
    NotAt(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid baud rate: {0}")]
    BadBaud(String),
    #[error("invalid channel: {0}")]
    BadChannel(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("empty reply")]
    Empty,
    #[error("reply lacks OK+RC prefix: {0}")]
    MissingPrefix(String),
    #[error("bad channel in reply: {0}")]
    BadChannel(String),
}

pub fn format_command(cmd: &AtCommand) -> String {
    match cmd {
        AtCommand::Test => "AT".to_string(),
        AtCommand::SetBaud(b) => format!("AT+B{}", b.as_u32()),
        AtCommand::SetChannel(ch) => format!("AT+C{}", ch.wire()),
        AtCommand::ReadChannel => "AT+RC".to_string(),
        AtCommand::Version => "AT+V".to_string(),
        AtCommand::Sleep => "AT+SLEEP".to_string(),
    }
}

/// Exact echo the module sends on success. `ReadChannel` and `Version`
/// carry data and have no fixed echo.
pub fn expected_reply(cmd: &AtCommand) -> Option<String> {
    match cmd {
        AtCommand::Test => Some("OK".to_string()),
        AtCommand::SetBaud(b) => Some(format!("OK+B{}", b.as_u32())),
        AtCommand::SetChannel(ch) => Some(format!("OK+C{}", ch.wire())),
        AtCommand::Sleep => Some("OK+SLEEP".to_string()),
        AtCommand::ReadChannel | AtCommand::Version => None,
    }
}

pub fn parse_command(line: &str) -> Result<AtCommand, ParseError> {
    let s = line.trim_matches(|c| c == '\r' || c == '\n' || c == ' ');
    if s.is_empty() {
        return Err(ParseError::Empty);
    }
    if s == "AT" {
        return Ok(AtCommand::Test);
    }
    let Some(body) = s.strip_prefix("AT+") else {
        return Err(ParseError::NotAt(s.to_string()));
    };

    match body {
        "RC" => Ok(AtCommand::ReadChannel),
        "V" => Ok(AtCommand::Version),
        "SLEEP" => Ok(AtCommand::Sleep),
        _ => {
            if let Some(v) = body.strip_prefix('B') {
                let n: u32 = v.parse().map_err(|_| ParseError::BadBaud(v.to_string()))?;
                let baud = Baud::try_from(n).map_err(|_| ParseError::BadBaud(v.to_string()))?;
                Ok(AtCommand::SetBaud(baud))
            } else if let Some(v) = body.strip_prefix('C') {
                if v.len() != 3 {
                    return Err(ParseError::BadChannel(v.to_string()));
                }
                let ch = Channel::parse_wire(v).map_err(|_| ParseError::BadChannel(v.to_string()))?;
                Ok(AtCommand::SetChannel(ch))
            } else {
                Err(ParseError::UnknownCommand(s.to_string()))
            }
        }
    }
}

/// Parse an `AT+RC` reply such as `OK+RC042`.
pub fn parse_read_channel(reply: &str) -> Result<Channel, ReplyError> {
    let s = reply.trim();
    if s.is_empty() {
        return Err(ReplyError::Empty);
    }
    let digits = s
        .strip_prefix(READ_CHANNEL_PREFIX)
        .ok_or_else(|| ReplyError::MissingPrefix(s.to_string()))?;
    Channel::parse_wire(digits).map_err(|_| ReplyError::BadChannel(digits.to_string()))
}
