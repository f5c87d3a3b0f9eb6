use tracing::debug;

use crate::config::LinkConfig;
use crate::hal::{Clock, ControlPin, PinDirection};
use crate::types::Mode;

/// Owns the SET pin and the mode it currently encodes.
#[derive(Debug)]
pub struct ModeController<P> {
    pin: P,
    mode: Mode,
}

impl<P: ControlPin> ModeController<P> {
    /// The pin is left untouched until [`claim`](Self::claim).
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            mode: Mode::Configuration,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    pub fn claim(&mut self) {
        self.pin.set_direction(PinDirection::Output);
    }

    pub fn release(&mut self) {
        self.pin.set_direction(PinDirection::Input);
    }

    /// Drive the pin for `target` and block for its settle delay. The pin is
    /// written even when `target` is already the recorded mode.
    pub fn set_mode<C: Clock>(&mut self, target: Mode, clock: &C, cfg: &LinkConfig) {
        if self.mode == target {
            debug!(mode = %target, "re-asserting mode");
        } else {
            debug!(from = %self.mode, to = %target, "changing mode");
        }
        self.mode = target;
        self.pin.write_level(target.level());
        clock.sleep(cfg.settle_for(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Level;
    use crate::sim::{SimClock, SimModule};
    use crate::types::{Baud, Channel};
    use std::time::Duration;

    fn controller() -> (ModeController<crate::sim::SimPin>, crate::sim::SimPin, SimClock) {
        let clock = SimClock::new();
        let module = SimModule::new(Baud::B9600, Channel::new(1).unwrap(), clock.clone());
        let pin = module.pin();
        (ModeController::new(pin.clone()), pin, clock)
    }

    #[test]
    fn pin_follows_mode_with_settle_delay() {
        let (mut mc, pin, clock) = controller();
        let cfg = LinkConfig::default();

        mc.set_mode(Mode::Transmission, &clock, &cfg);
        assert_eq!(mc.mode(), Mode::Transmission);
        assert_eq!(pin.level(), Level::High);
        assert_eq!(clock.now(), Duration::from_millis(80));

        mc.set_mode(Mode::Configuration, &clock, &cfg);
        assert_eq!(mc.mode(), Mode::Configuration);
        assert_eq!(pin.level(), Level::Low);
        assert_eq!(clock.now(), Duration::from_millis(120));
    }

    #[test]
    fn same_mode_is_written_exactly_once_more() {
        let (mut mc, pin, clock) = controller();
        let cfg = LinkConfig::default();
        mc.set_mode(Mode::Configuration, &clock, &cfg);
        mc.set_mode(Mode::Configuration, &clock, &cfg);
        assert_eq!(pin.writes(), vec![Level::Low, Level::Low]);
        assert_eq!(clock.now(), Duration::from_millis(80));
    }

    #[test]
    fn claim_and_release_set_direction() {
        let (mut mc, pin, _clock) = controller();
        assert_eq!(pin.direction(), None);
        mc.claim();
        assert_eq!(pin.direction(), Some(PinDirection::Output));
        mc.release();
        assert_eq!(pin.direction(), Some(PinDirection::Input));
    }
}
