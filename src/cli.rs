use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use hc12_link::LinkConfig;
use hc12_link::port::SetPinSpec;

#[derive(Parser, Debug, Clone)]
#[command(name = "hc12-link", about = "Configure an HC-12 radio module over its AT command mode")]
pub struct Cli {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Detect the module's current baud rate
    Probe,
    /// Converge the module to a baud rate and channel, then leave it transmitting
    Setup {
        /// Target baud rate
        #[arg(long, default_value_t = 9_600)]
        baud: u32,
        /// Target channel (1..=127)
        #[arg(long, default_value_t = 1)]
        channel: u8,
    },
    /// Read the configured channel
    Channel,
    /// Read the firmware version string
    Version,
    /// Put the module to sleep
    Sleep,
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device the module's TX/RX are wired to
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// SET pin: gpio:<n>, rts:<device> or dtr:<device>
    #[arg(long, default_value = "gpio:17")]
    pub set_pin: SetPinSpec,
    /// Talk to a simulated module instead of hardware
    #[arg(long, default_value_t = false)]
    pub sim: bool,
    /// Response timeout in milliseconds
    #[arg(long, default_value_t = 80)]
    pub response_timeout_ms: u64,
    /// Quiet gap that ends a reply, in microseconds
    #[arg(long, default_value_t = 5_120)]
    pub byte_gap_us: u64,
}

impl SerialOpts {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::default()
            .with_response_timeout(Duration::from_millis(self.response_timeout_ms))
            .with_byte_gap(Duration::from_micros(self.byte_gap_us))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_setup() {
        let cli = Cli::try_parse_from([
            "hc12-link",
            "--dev",
            "/dev/ttyS1",
            "--set-pin",
            "rts:/dev/ttyUSB3",
            "-vv",
            "setup",
            "--baud",
            "19200",
            "--channel",
            "42",
        ])
        .unwrap();
        assert_eq!(cli.ser.dev, "/dev/ttyS1");
        assert_eq!(cli.ser.set_pin, SetPinSpec::Rts("/dev/ttyUSB3".into()));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.cmd,
            Cmd::Setup {
                baud: 19_200,
                channel: 42
            }
        ));
    }

    #[test]
    fn timing_flags_reach_config() {
        let cli = Cli::try_parse_from([
            "hc12-link",
            "--response-timeout-ms",
            "40",
            "--byte-gap-us",
            "1000",
            "probe",
        ])
        .unwrap();
        let cfg = cli.ser.link_config();
        assert_eq!(cfg.response_timeout, Duration::from_millis(40));
        assert_eq!(cfg.byte_gap, Duration::from_micros(1000));
    }

    #[test]
    fn rejects_bad_set_pin() {
        assert!(Cli::try_parse_from(["hc12-link", "--set-pin", "nope", "probe"]).is_err());
    }
}
