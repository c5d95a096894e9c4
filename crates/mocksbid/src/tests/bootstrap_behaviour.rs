//! Behavioural tests for the emulator bootstrap and launch sequence.

use std::cell::RefCell;

use mocksbi_config::Purpose;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::process::LaunchError;

use super::support::{self, EmulatorWorld, HealthEvent};

#[fixture]
fn world() -> RefCell<EmulatorWorld> {
    support::world()
}

#[given("a registration emulator configuration")]
fn given_registration_configuration(world: &RefCell<EmulatorWorld>) {
    world.borrow_mut().use_purpose(Purpose::Registration);
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<EmulatorWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[given("a registration emulator configuration whose only port is occupied")]
fn given_occupied_port(world: &RefCell<EmulatorWorld>) {
    world.borrow_mut().occupy_only_port(Purpose::Registration);
}

#[given("a files root describing a face camera with device id \"{device_id}\"")]
fn given_file_tree(world: &RefCell<EmulatorWorld>, device_id: String) {
    let discovery = format!(
        r#"{{"deviceId":"{device_id}","deviceCode":"FILE-FACE","serviceVersion":"1.0.0","specVersion":["0.9.5"]}}"#
    );
    world.borrow_mut().use_file_tree(&[
        ("devices/face/discovery.json", &discovery),
        ("devices/face/digital_id.json", r#"{"serialNo":"face-0001","make":"MOCK"}"#),
    ]);
}

#[when("the emulator starts")]
fn when_emulator_starts(world: &RefCell<EmulatorWorld>) {
    world.borrow_mut().start();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<EmulatorWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    assert!(world.daemon_started(), "daemon should have been initialised");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<EmulatorWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_some(),
        "bootstrap succeeded unexpectedly"
    );
}

#[then("launching the listener fails")]
fn then_launch_fails(world: &RefCell<EmulatorWorld>) {
    let world = world.borrow();
    assert!(
        matches!(world.launch_error(), Some(LaunchError::Listener { .. })),
        "expected a listener error, got {:?}",
        world.launch_error()
    );
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<EmulatorWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<EmulatorWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<EmulatorWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[then("the reporter recorded the bound listener")]
fn then_reporter_bound(world: &RefCell<EmulatorWorld>) {
    let world = world.borrow();
    let address = world.address();
    let events = world.reporter.events();
    assert!(
        events.contains(&HealthEvent::ListenerBound(address)),
        "listener bound event missing for {address}: {events:?}"
    );
    assert!(address.ip().is_loopback());
}

#[scenario(path = "tests/features/emulator_bootstrap.feature")]
fn emulator_bootstrap(world: RefCell<EmulatorWorld>) {
    let _ = world;
}
