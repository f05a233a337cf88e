//! End-to-end discovery sweeps against a scripted bench of mock ports.

use fixture_scout::classify::ClassifierThresholds;
use fixture_scout::descriptor::LineEnding;
use fixture_scout::discovery::{discover, CancelToken, DiscoveryHooks};
use fixture_scout::port::MockPortOpener;
use fixture_scout::probe::ProbeOptions;
use fixture_scout::reader::TailReadConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HELP_REPLY: &[u8] = b"CONTROL COMMAND:\r\n\
    ?:GET COMMAND INFO\r\n\
    HELP:GET COMMAND INFO\r\n\
    VERSION:GET FIRMWARE INFO\r\n\
    IN:FIXTURE IN\r\n\
    OUT:FIXTURE OUT\r\n\
    RESET:CONTROL BOARD RESET\r\n\
    STATE:GET FIXTURE STATE\r\n";

/// Shrunk sweep plan so silent ports cost milliseconds, not seconds.
fn fast_opts() -> ProbeOptions {
    ProbeOptions {
        baud_rates: vec![115_200, 9_600],
        probe_commands: vec!["?".to_string()],
        line_endings: vec![LineEnding::Crlf, LineEnding::None],
        settle_delay: Duration::ZERO,
        drain_boot_noise: false,
        read: TailReadConfig {
            first_byte_timeout: Duration::from_millis(25),
            tail_timeout: Duration::from_millis(15),
            max_after_first_data: Duration::from_millis(250),
            poll_interval: Duration::from_millis(1),
        },
        boot_drain_read: TailReadConfig {
            first_byte_timeout: Duration::from_millis(10),
            tail_timeout: Duration::from_millis(10),
            max_after_first_data: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
        },
        thresholds: ClassifierThresholds::default(),
    }
}

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_discovery_stops_at_first_fixture() {
    let opener = MockPortOpener::new();
    opener.add_silent_port("COM1");
    opener.add_unopenable_port("COM2");
    opener.add_device("COM3", Duration::from_millis(2), HELP_REPLY);
    opener.add_silent_port("COM4");
    opener.add_device("COM5", Duration::from_millis(2), HELP_REPLY);

    let outcome = discover(
        &opener,
        &names(&["COM1", "COM2", "COM3", "COM4", "COM5"]),
        &[],
        &fast_opts(),
        &DiscoveryHooks::default(),
    );

    let descriptor = outcome.descriptor.clone().expect("fixture on COM3");
    assert_eq!(descriptor.port, "COM3");
    assert_eq!(descriptor.baud_rate, 115_200);
    assert_eq!(descriptor.line_ending, LineEnding::Crlf);
    assert_eq!(outcome.descriptor_string().unwrap(), "COM3@115200@CRLF");

    // Ports after the hit were never touched.
    let touched = opener.touched_ports();
    assert!(touched.contains(&"COM1".to_string()));
    assert!(touched.contains(&"COM3".to_string()));
    assert!(!touched.contains(&"COM4".to_string()));
    assert!(!touched.contains(&"COM5".to_string()));

    // Every probed port shows up in the attempt log, the hit last.
    assert_eq!(outcome.attempts.len(), 3);
    assert!(outcome.attempts[2].is_fixture);
}

#[test]
fn test_preferred_port_is_probed_first() {
    let opener = MockPortOpener::new();
    opener.add_device("COM1", Duration::from_millis(2), HELP_REPLY);
    opener.add_device("COM7", Duration::from_millis(2), HELP_REPLY);

    let outcome = discover(
        &opener,
        &names(&["COM1", "COM7"]),
        &names(&["COM7"]),
        &fast_opts(),
        &DiscoveryHooks::default(),
    );

    // Both would qualify; preference decides which one wins.
    assert_eq!(outcome.descriptor.unwrap().port, "COM7");
    assert_eq!(opener.touched_ports(), vec!["COM7".to_string()]);
}

#[test]
fn test_baud_sweep_lands_on_answering_rate() {
    let opener = MockPortOpener::new();
    opener.add_device_at_baud("COM3", 9_600, Duration::from_millis(2), HELP_REPLY);

    let outcome = discover(
        &opener,
        &names(&["COM3"]),
        &[],
        &fast_opts(),
        &DiscoveryHooks::default(),
    );

    let descriptor = outcome.descriptor.clone().expect("fixture at 9600");
    assert_eq!(descriptor.baud_rate, 9_600);
    assert_eq!(outcome.descriptor_string().unwrap(), "COM3@9600@CRLF");
}

#[test]
fn test_no_fixture_yields_diagnostics_for_every_port() {
    let opener = MockPortOpener::new();
    opener.add_silent_port("COM1");
    opener.add_unopenable_port("COM2");
    // Chatty but not a fixture.
    opener.add_device("COM3", Duration::from_millis(2), b"TEMP:23.5\r\nHUM:41\r\n");

    let outcome = discover(
        &opener,
        &names(&["COM1", "COM2", "COM3"]),
        &[],
        &fast_opts(),
        &DiscoveryHooks::default(),
    );

    assert!(outcome.descriptor.is_none());
    assert!(outcome.descriptor_string().is_none());
    assert_eq!(outcome.attempts.len(), 3);
    assert!(outcome.attempts.iter().all(|a| !a.is_fixture));
    // The chatty port's evidence is preserved for the operator.
    assert!(outcome.attempts[2].score > 0);
    assert!(outcome.attempts[2].sample.contains("TEMP:23.5"));
}

#[test]
fn test_progress_hook_sees_every_probed_port() {
    let opener = MockPortOpener::new();
    opener.add_silent_port("COM1");
    opener.add_device("COM2", Duration::from_millis(2), HELP_REPLY);

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let hooks = DiscoveryHooks {
        cancel: None,
        progress: Some(Box::new(move |_result| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    };

    let outcome = discover(&opener, &names(&["COM1", "COM2"]), &[], &fast_opts(), &hooks);
    assert!(outcome.descriptor.is_some());
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cancelled_sweep_returns_partial_attempts() {
    let opener = MockPortOpener::new();
    opener.add_silent_port("COM1");
    opener.add_device("COM2", Duration::from_millis(2), HELP_REPLY);

    let token = CancelToken::new();
    let trip = token.clone();
    let hooks = DiscoveryHooks {
        cancel: Some(token),
        // Cancel as soon as the first port reports.
        progress: Some(Box::new(move |_result| trip.cancel())),
    };

    let outcome = discover(&opener, &names(&["COM1", "COM2"]), &[], &fast_opts(), &hooks);
    assert!(outcome.descriptor.is_none());
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(opener.touched_ports(), vec!["COM1".to_string()]);
}

#[test]
fn test_descriptor_round_trips_into_a_session_target() {
    let opener = MockPortOpener::new();
    opener.add_device("COM3", Duration::from_millis(2), HELP_REPLY);

    let outcome = discover(
        &opener,
        &names(&["COM3"]),
        &[],
        &fast_opts(),
        &DiscoveryHooks::default(),
    );

    let text = outcome.descriptor_string().unwrap();
    let parsed: fixture_scout::descriptor::PortDescriptor = text.parse().unwrap();
    assert_eq!(Some(parsed), outcome.descriptor);
}
