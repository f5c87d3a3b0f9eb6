use thiserror::Error;

use crate::types::Mode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("baud rate {0} is not supported by the module")]
    InvalidSpeed(u32),
    #[error("channel {0} out of range (1..=127)")]
    InvalidChannel(u32),
    #[error("command requires configuration mode, module is in {0} mode")]
    WrongMode(Mode),
    #[error("no response within timeout")]
    NoResponse,
    #[error("unexpected response: expected {expected:?}, got {got:?}")]
    UnexpectedResponse { expected: String, got: String },
    #[error("baud rate not detected, no candidate answered AT")]
    SpeedNotDetected,
    #[error("transport: {0}")]
    Transport(String),
}

pub type Result<T, E = LinkError> = std::result::Result<T, E>;
