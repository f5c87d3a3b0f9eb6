use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hc12_link::hal::{Clock, ControlPin, SystemClock, Transport};
use hc12_link::port::{SerialTransport, open_set_pin};
use hc12_link::sim::{SimClock, SimModule};
use hc12_link::{Baud, Channel, Hc12, Mode};

mod cli;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);
    let cfg = args.ser.link_config();

    if args.ser.sim {
        let clock = SimClock::new();
        let module = SimModule::new(Baud::B9600, Channel::new(1)?, clock.clone());
        let pin = module.pin();
        run(Hc12::new(module, pin, clock, cfg), args.cmd)
    } else {
        let transport = SerialTransport::new(&args.ser.dev);
        let pin = open_set_pin(&args.ser.set_pin);
        run(Hc12::new(transport, pin, SystemClock::new(), cfg), args.cmd)
    }
}

fn run<T, P, C>(mut hc12: Hc12<T, P, C>, cmd: cli::Cmd) -> Result<()>
where
    T: Transport,
    P: ControlPin,
    C: Clock,
{
    let result = match cmd {
        cli::Cmd::Setup { baud, channel } => hc12
            .begin(baud, channel)
            .with_context(|| format!("setting up module at {baud} baud, channel {channel}")),
        cli::Cmd::Probe => detect(&mut hc12).map(|baud| println!("{baud}")),
        cli::Cmd::Channel => detect(&mut hc12).and_then(|_| {
            let ch = hc12.detect_channel().context("reading channel")?;
            println!("{ch}");
            Ok(())
        }),
        cli::Cmd::Version => detect(&mut hc12).and_then(|_| {
            let fw = hc12.firmware_version().context("reading firmware version")?;
            println!("{fw}");
            Ok(())
        }),
        cli::Cmd::Sleep => detect(&mut hc12)
            .and_then(|_| hc12.sleep().context("putting module to sleep")),
    };
    if result.is_err() || hc12.mode() != Mode::Transmission {
        hc12.end();
    }
    result
}

/// Claim the SET pin and find the module's live speed.
fn detect<T: Transport, P: ControlPin, C: Clock>(hc12: &mut Hc12<T, P, C>) -> Result<Baud> {
    hc12.claim_pin();
    hc12.enter_command_mode()
        .detect_baud()
        .context("detecting module baud rate")
}
