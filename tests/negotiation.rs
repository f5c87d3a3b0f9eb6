use std::time::Duration;

use pretty_assertions::assert_eq;

use hc12_link::command::AtCommand;
use hc12_link::hal::{Clock, Level, PinDirection, Transport};
use hc12_link::reader::read_response;
use hc12_link::sim::{SimClock, SimModule, SimPin};
use hc12_link::{Baud, Channel, Hc12, LinkConfig, LinkError, Mode, NegotiationState};

type SimSession = Hc12<SimModule, SimPin, SimClock>;

fn rig(baud: Baud, channel: u8) -> (SimSession, SimModule, SimClock) {
    let clock = SimClock::new();
    let module = SimModule::new(baud, Channel::new(channel).unwrap(), clock.clone());
    let session = Hc12::new(module.clone(), module.pin(), clock.clone(), LinkConfig::default());
    (session, module, clock)
}

fn wire(log: &[(Baud, &str)]) -> Vec<(Baud, String)> {
    log.iter().map(|(b, s)| (*b, s.to_string())).collect()
}

#[test]
fn begin_converges_speed_and_channel() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);

    s.begin(19_200, 5).unwrap();

    assert_eq!(
        module.sent(),
        wire(&[
            (Baud::B1200, "AT"),
            (Baud::B2400, "AT"),
            (Baud::B4800, "AT"),
            (Baud::B9600, "AT"),
            (Baud::B9600, "AT+B19200"),
            (Baud::B19200, "AT+RC"),
            (Baud::B19200, "AT+C005"),
        ])
    );
    assert_eq!(module.baud(), Baud::B19200);
    assert_eq!(module.channel().get(), 5);
    assert_eq!(module.host_baud(), Some(Baud::B19200));

    assert_eq!(s.baud(), Some(Baud::B19200));
    assert_eq!(s.channel(), Channel::new(5).ok());
    assert_eq!(s.mode(), Mode::Transmission);
    assert_eq!(s.state(), NegotiationState::Converged);
    assert_eq!(s.pin().level(), Level::High);
    assert_eq!(s.pin().direction(), Some(PinDirection::Output));
}

#[test]
fn begin_skips_commands_already_satisfied() {
    let (mut s, module, _clock) = rig(Baud::B9600, 42);

    s.begin(9_600, 42).unwrap();

    let commands = module.sent_commands();
    assert_eq!(commands, vec!["AT", "AT", "AT", "AT", "AT+RC"]);
    assert_eq!(s.state(), NegotiationState::Converged);
}

#[test]
fn unreadable_channel_forces_change_command() {
    let (mut s, module, _clock) = rig(Baud::B9600, 5);
    module.set_reply_override(&AtCommand::ReadChannel, "ERROR");

    s.begin(9_600, 5).unwrap();

    assert_eq!(
        module.sent_commands(),
        vec!["AT", "AT", "AT", "AT", "AT+RC", "AT+C005"]
    );
    assert_eq!(s.channel(), Channel::new(5).ok());
    assert_eq!(s.state(), NegotiationState::Converged);
}

#[test]
fn rejected_channel_change_aborts() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    module.set_reply_override(&AtCommand::SetChannel(Channel::new(5).unwrap()), "ERROR");

    assert_eq!(
        s.begin(9_600, 5),
        Err(LinkError::UnexpectedResponse {
            expected: "OK+C005".into(),
            got: "ERROR".into(),
        })
    );
    assert_eq!(s.state(), NegotiationState::Aborted);
    assert_eq!(s.mode(), Mode::Configuration);
    assert_eq!(s.baud(), None);
    assert_eq!(s.channel(), None);
    assert_eq!(module.host_baud(), None);
    assert_eq!(module.channel().get(), 1);
    assert_eq!(s.pin().direction(), Some(PinDirection::Input));
}

#[test]
fn probe_only_fourth_candidate_answers() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    let baud = s.enter_command_mode().detect_baud().unwrap();
    assert_eq!(baud, Baud::B9600);

    let probed: Vec<Baud> = module.sent().into_iter().map(|(b, _)| b).collect();
    assert_eq!(probed, Baud::ALL[..4].to_vec());
}

#[test]
fn converge_is_idempotent() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    s.enter_command_mode().detect_baud().unwrap();
    module.clear_log();

    s.change_baud(38_400).unwrap();
    s.change_channel(7).unwrap();
    assert_eq!(module.sent_commands(), vec!["AT+B38400", "AT+C007"]);
    assert_eq!(s.mode(), Mode::Configuration);

    module.clear_log();
    s.change_baud(38_400).unwrap();
    s.change_channel(7).unwrap();
    assert!(module.sent().is_empty());
    assert_eq!(s.baud(), Some(Baud::B38400));
    assert_eq!(s.channel(), Channel::new(7).ok());
}

#[test]
fn out_of_range_channels_never_reach_the_wire() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    s.enter_command_mode().detect_baud().unwrap();
    module.clear_log();

    assert_eq!(s.change_channel(0), Err(LinkError::InvalidChannel(0)));
    assert_eq!(s.change_channel(128), Err(LinkError::InvalidChannel(128)));
    assert!(module.sent().is_empty());
    assert!(s.pin().writes().is_empty());
}

#[test]
fn invalid_begin_arguments_touch_nothing() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);

    assert_eq!(s.begin(9_600, 128), Err(LinkError::InvalidChannel(128)));
    assert_eq!(s.begin(14_400, 5), Err(LinkError::InvalidSpeed(14_400)));

    assert!(module.sent().is_empty());
    assert!(s.pin().writes().is_empty());
    assert_eq!(s.pin().direction(), None);
    assert_eq!(s.state(), NegotiationState::Idle);
}

#[test]
fn silent_transport_times_out_exactly() {
    let clock = SimClock::new();
    let mut module = SimModule::new(Baud::B9600, Channel::new(1).unwrap(), clock.clone());
    module.open(Baud::B9600).unwrap();
    let cfg = LinkConfig::default();

    for timeout in [Duration::from_millis(80), Duration::from_micros(12_345)] {
        let start = clock.now();
        let r = read_response(&mut module, &clock, &cfg, timeout).unwrap();
        assert!(r.is_empty());
        assert_eq!(clock.now() - start, timeout);
    }
}

#[test]
fn commands_outside_configuration_mode_are_refused() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    s.enter_command_mode().detect_baud().unwrap();
    s.set_mode(Mode::Transmission);
    module.clear_log();

    assert_eq!(
        s.send_and_expect("AT", "OK"),
        Err(LinkError::WrongMode(Mode::Transmission))
    );
    assert_eq!(s.test_at(), Err(LinkError::WrongMode(Mode::Transmission)));
    assert_eq!(s.change_baud(9_600), Err(LinkError::WrongMode(Mode::Transmission)));
    assert!(matches!(s.detect_baud(), Err(LinkError::WrongMode(_))));
    assert!(module.sent().is_empty());
}

#[test]
fn sleep_returns_to_transmission_either_way() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    s.begin(9_600, 1).unwrap();

    s.sleep().unwrap();
    assert!(s.is_asleep());
    assert_eq!(s.mode(), Mode::Transmission);

    s.wake();
    module.set_silent(true);
    assert_eq!(s.sleep(), Err(LinkError::NoResponse));
    assert!(!s.is_asleep());
    assert_eq!(s.mode(), Mode::Transmission);
}

#[test]
fn end_after_begin_returns_to_unnegotiated() {
    let (mut s, module, _clock) = rig(Baud::B9600, 1);
    s.begin(57_600, 100).unwrap();
    s.end();

    assert_eq!(s.baud(), None);
    assert_eq!(s.channel(), None);
    assert_eq!(s.mode(), Mode::Configuration);
    assert_eq!(s.state(), NegotiationState::Idle);
    assert_eq!(module.host_baud(), None);
    assert_eq!(s.pin().direction(), Some(PinDirection::Input));

    // module kept its settings, so a second begin only probes
    module.clear_log();
    s.begin(57_600, 100).unwrap();
    assert_eq!(module.sent_commands().last().map(String::as_str), Some("AT+RC"));
}
