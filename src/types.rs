use std::fmt;

use crate::error::LinkError;
use crate::hal::Level;

/// Transport speeds the module accepts, ascending. Probe order follows
/// declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Baud {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl Baud {
    pub const ALL: [Baud; 8] = [
        Baud::B1200,
        Baud::B2400,
        Baud::B4800,
        Baud::B9600,
        Baud::B19200,
        Baud::B38400,
        Baud::B57600,
        Baud::B115200,
    ];

    pub const fn as_u32(self) -> u32 {
        match self {
            Baud::B1200 => 1_200,
            Baud::B2400 => 2_400,
            Baud::B4800 => 4_800,
            Baud::B9600 => 9_600,
            Baud::B19200 => 19_200,
            Baud::B38400 => 38_400,
            Baud::B57600 => 57_600,
            Baud::B115200 => 115_200,
        }
    }
}

impl TryFrom<u32> for Baud {
    type Error = LinkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Baud::ALL
            .into_iter()
            .find(|b| b.as_u32() == value)
            .ok_or(LinkError::InvalidSpeed(value))
    }
}

impl fmt::Display for Baud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Radio channel, always within 1..=127.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 127;

    pub fn new(ch: u8) -> Result<Self, LinkError> {
        if (Self::MIN..=Self::MAX).contains(&ch) {
            Ok(Channel(ch))
        } else {
            Err(LinkError::InvalidChannel(ch as u32))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-padded 3-digit form used on the wire ("005", "042", "127").
    pub fn wire(self) -> String {
        format!("{:03}", self.0)
    }

    /// Parse the digit suffix of a channel reply. Leading zeros are allowed.
    pub fn parse_wire(digits: &str) -> Result<Self, LinkError> {
        let digits = digits.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LinkError::InvalidChannel(0));
        }
        let n: u32 = digits.parse().map_err(|_| LinkError::InvalidChannel(0))?;
        u8::try_from(n)
            .map_err(|_| LinkError::InvalidChannel(n))
            .and_then(Channel::new)
    }
}

impl TryFrom<u8> for Channel {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Channel::new(value)
    }
}

impl TryFrom<u32> for Channel {
    type Error = LinkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| LinkError::InvalidChannel(value))
            .and_then(Channel::new)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Electrical mode of the module, mirrored on the SET pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Configuration,
    Transmission,
}

impl Mode {
    pub const fn level(self) -> Level {
        match self {
            Mode::Configuration => Level::Low,
            Mode::Transmission => Level::High,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Configuration => "configuration",
            Mode::Transmission => "transmission",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bauds_are_ascending() {
        let values: Vec<u32> = Baud::ALL.iter().map(|b| b.as_u32()).collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(values, sorted);
        assert_eq!(values.len(), 8);
    }

    #[test]
    fn baud_from_u32() {
        assert_eq!(Baud::try_from(9600).unwrap(), Baud::B9600);
        assert_eq!(Baud::try_from(9601), Err(LinkError::InvalidSpeed(9601)));
        assert_eq!(Baud::B115200.to_string(), "115200");
    }

    #[test]
    fn channel_bounds() {
        assert!(matches!(Channel::new(0), Err(LinkError::InvalidChannel(0))));
        assert!(matches!(
            Channel::new(128),
            Err(LinkError::InvalidChannel(128))
        ));
        assert!(matches!(
            Channel::try_from(300u32),
            Err(LinkError::InvalidChannel(300))
        ));
        assert_eq!(Channel::new(1).unwrap().get(), 1);
        assert_eq!(Channel::new(127).unwrap().get(), 127);
    }

    #[test]
    fn channel_wire_form() {
        assert_eq!(Channel::new(5).unwrap().wire(), "005");
        assert_eq!(Channel::new(42).unwrap().wire(), "042");
        assert_eq!(Channel::new(127).unwrap().wire(), "127");
    }

    #[test]
    fn channel_wire_is_three_digits_and_parses_back() {
        for n in Channel::MIN..=Channel::MAX {
            let ch = Channel::new(n).unwrap();
            let wire = ch.wire();
            assert_eq!(wire.len(), 3, "channel {n}");
            assert_eq!(Channel::parse_wire(&wire).unwrap(), ch);
        }
    }

    #[test]
    fn channel_parse_rejects_garbage() {
        assert!(Channel::parse_wire("").is_err());
        assert!(Channel::parse_wire("0x1").is_err());
        assert!(Channel::parse_wire("000").is_err());
        assert!(Channel::parse_wire("200").is_err());
    }

    #[test]
    fn mode_levels() {
        assert_eq!(Mode::Configuration.level(), Level::Low);
        assert_eq!(Mode::Transmission.level(), Level::High);
    }
}
