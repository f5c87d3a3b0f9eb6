//! Driver for HC-12 style serial radio modules configured through AT
//! commands while their SET pin is held low.
//!
//! [`Hc12`] owns the transport and SET pin. [`Hc12::begin`] detects the
//! module's current speed by trying every supported rate, moves it to the
//! requested speed and channel, and leaves it in transmission mode.

pub mod command;
pub mod config;
pub mod error;
pub mod hal;
pub mod mode;
pub mod negotiate;
pub mod port;
pub mod reader;
pub mod session;
pub mod sim;
pub mod types;

pub use config::LinkConfig;
pub use error::{LinkError, Result};
pub use negotiate::NegotiationState;
pub use reader::Response;
pub use session::{CommandMode, Hc12};
pub use types::{Baud, Channel, Mode};
