//! Host-side hardware: a `serialport` transport and the SET pin drivers.

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::hal::{ControlPin, Level, PinDirection, Transport};
use crate::types::Baud;

fn transport_err(dev: &str, e: impl std::fmt::Display) -> LinkError {
    LinkError::Transport(format!("{dev}: {e}"))
}

/// 8N1 serial device, reopened on every speed change.
pub struct SerialTransport {
    dev: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn new(dev: impl Into<String>) -> Self {
        Self {
            dev: dev.into(),
            port: None,
        }
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        let dev = &self.dev;
        self.port
            .as_mut()
            .ok_or_else(|| transport_err(dev, "port not open"))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, baud: Baud) -> Result<()> {
        // drop the old handle first; some drivers refuse a second open
        self.port = None;
        let port = serialport::new(&self.dev, baud.as_u32())
            .timeout(Duration::from_millis(1))
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| transport_err(&self.dev, e))?;
        debug!(dev = %self.dev, %baud, "port opened");
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(dev = %self.dev, "port closed");
        }
    }

    fn bytes_available(&mut self) -> Result<bool> {
        let dev = self.dev.clone();
        let n = self
            .port()?
            .bytes_to_read()
            .map_err(|e| transport_err(&dev, e))?;
        Ok(n > 0)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if !self.bytes_available()? {
            return Ok(None);
        }
        let dev = self.dev.clone();
        let mut buf = [0u8; 1];
        match self.port()?.read(&mut buf) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(transport_err(&dev, e)),
        }
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let dev = self.dev.clone();
        let port = self.port()?;
        port.write_all(data).map_err(|e| transport_err(&dev, e))?;
        port.flush().map_err(|e| transport_err(&dev, e))
    }
}

/// Where the module's SET input is wired, as given on the command line:
/// `gpio:<n>`, `rts:<device>` or `dtr:<device>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetPinSpec {
    Gpio(u32),
    Rts(String),
    Dtr(String),
}

impl FromStr for SetPinSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (kind, arg) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("SET pin must be gpio:<n>, rts:<dev> or dtr:<dev>"))?;
        if arg.is_empty() {
            bail!("missing SET pin argument in {s:?}");
        }
        match kind.to_ascii_lowercase().as_str() {
            "gpio" => Ok(SetPinSpec::Gpio(
                arg.parse()
                    .map_err(|_| anyhow!("gpio number must be an integer: {arg}"))?,
            )),
            "rts" => Ok(SetPinSpec::Rts(arg.to_string())),
            "dtr" => Ok(SetPinSpec::Dtr(arg.to_string())),
            other => bail!("unknown SET pin kind: {other}"),
        }
    }
}

/// Linux sysfs GPIO line.
pub struct SysfsPin {
    base: PathBuf,
    gpio: u32,
}

impl SysfsPin {
    pub fn new(gpio: u32) -> Self {
        Self {
            base: PathBuf::from("/sys/class/gpio"),
            gpio,
        }
    }

    fn line(&self) -> PathBuf {
        self.base.join(format!("gpio{}", self.gpio))
    }

    fn write_attr(&self, attr: &str, value: &str) {
        let path = self.line().join(attr);
        if let Err(e) = fs::write(&path, value) {
            warn!(path = %path.display(), error = %e, "gpio write failed");
        }
    }
}

impl ControlPin for SysfsPin {
    fn set_direction(&mut self, dir: PinDirection) {
        if !self.line().exists()
            && let Err(e) = fs::write(self.base.join("export"), self.gpio.to_string())
        {
            warn!(gpio = self.gpio, error = %e, "gpio export failed");
        }
        self.write_attr(
            "direction",
            match dir {
                PinDirection::Output => "out",
                PinDirection::Input => "in",
            },
        );
    }

    fn write_level(&mut self, level: Level) {
        self.write_attr(
            "value",
            match level {
                Level::Low => "0",
                Level::High => "1",
            },
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum ModemLine {
    Rts,
    Dtr,
}

/// RTS or DTR of a second serial adapter driving SET.
///
/// Adapters invert these lines: asserted means electrically low.
pub struct ModemLinePin {
    dev: String,
    line: ModemLine,
    port: Option<Box<dyn SerialPort>>,
}

impl ModemLinePin {
    fn new(dev: String, line: ModemLine) -> Self {
        Self {
            dev,
            line,
            port: None,
        }
    }

    fn drive(&mut self, asserted: bool) {
        let Some(port) = self.port.as_mut() else {
            warn!(dev = %self.dev, "SET line not claimed");
            return;
        };
        let res = match self.line {
            ModemLine::Rts => port.write_request_to_send(asserted),
            ModemLine::Dtr => port.write_data_terminal_ready(asserted),
        };
        if let Err(e) = res {
            warn!(dev = %self.dev, line = ?self.line, error = %e, "modem line write failed");
        }
    }
}

impl ControlPin for ModemLinePin {
    fn set_direction(&mut self, dir: PinDirection) {
        match dir {
            PinDirection::Output => {
                if self.port.is_none() {
                    match serialport::new(&self.dev, 9_600).open() {
                        Ok(p) => self.port = Some(p),
                        Err(e) => warn!(dev = %self.dev, error = %e, "cannot open SET line port"),
                    }
                }
            }
            PinDirection::Input => {
                self.drive(false);
                self.port = None;
            }
        }
    }

    fn write_level(&mut self, level: Level) {
        self.drive(level == Level::Low);
    }
}

pub fn open_set_pin(spec: &SetPinSpec) -> Box<dyn ControlPin> {
    match spec {
        SetPinSpec::Gpio(n) => Box::new(SysfsPin::new(*n)),
        SetPinSpec::Rts(dev) => Box::new(ModemLinePin::new(dev.clone(), ModemLine::Rts)),
        SetPinSpec::Dtr(dev) => Box::new(ModemLinePin::new(dev.clone(), ModemLine::Dtr)),
    }
}

impl ControlPin for Box<dyn ControlPin> {
    fn set_direction(&mut self, dir: PinDirection) {
        (**self).set_direction(dir)
    }

    fn write_level(&mut self, level: Level) {
        (**self).write_level(level)
    }
}
