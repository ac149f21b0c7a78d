// Rescue scenarios on virtual time
mod common;

use approx::assert_relative_eq;
use common::{alert, beacon, done, TestRig};
use rescue_core::hal::{Clock, IndicatorMode, RawPacket};
use rescue_library::algorithms::normalize::{normalize_signal, normalize_sound};
use rescue_library::config::{FusionSettings, ScanProfile, ScanSettings};
use rescue_library::nodes::protocol::Handled;
use rescue_library::nodes::ScanEngine;
use rescue_library::{
    ApproachOutcome, DeviceId, Interrupt, MessageKind, ReceivedMessage, RescueConfig,
    RescueOutcome, RescuePhase, Robot, SelfStatus, SharedState,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

const TARGET: DeviceId = DeviceId(7);

fn robot(id: u32, rig: &TestRig, config: &RescueConfig) -> Robot {
    Robot::with_seed(DeviceId(id), rig.hardware(), config, 42).unwrap()
}

/// Run `action` once, the first time virtual time reaches `at_ms`
fn at_time(rig: &TestRig, at_ms: u64, action: impl Fn() + Send + 'static) -> Arc<AtomicU64> {
    let fired = Arc::new(AtomicBool::new(false));
    let fired_at = Arc::new(AtomicU64::new(0));
    let stamp = fired_at.clone();
    rig.clock.on_advance(move |now| {
        if now >= at_ms && !fired.swap(true, Ordering::SeqCst) {
            stamp.store(now, Ordering::SeqCst);
            action();
        }
    });
    fired_at
}

#[test]
fn test_loud_target_runs_until_timeout() {
    let rig = TestRig::new(100);
    let robot = robot(101, &rig, &RescueConfig::default());

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Completed(ApproachOutcome::Timeout));
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
    assert_eq!(robot.state().target(), None);
    assert_eq!(rig.drive.current(), (0, 0));
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Calm));
    // pre-scan 200 + full scan 1800 + approach limit 5000
    assert!(rig.now() >= 7000, "finished at {}", rig.now());

    let commands = rig.drive.commands();
    assert_eq!(commands[0], (-40, 40), "left window first");
    assert!(commands.contains(&(25, 25)));
    // Brief rescans happened along the way
    assert!(commands.contains(&(-35, 35)));
    // Empathized after the pivot
    assert!(rig.indicator.sounds() >= 1);
}

#[test]
fn test_equal_scores_pivot_right() {
    let rig = TestRig::new(50);
    let state = Arc::new(SharedState::new());
    let engine = ScanEngine::new(
        rig.hardware(),
        state.clone(),
        ScanSettings::default(),
        FusionSettings::default(),
    );
    let ticket = state.try_begin_rescue(TARGET).unwrap();

    let result = engine.scan_and_pivot(&ticket, &ScanProfile::full()).unwrap();

    assert_eq!(result.left, result.right);
    assert_eq!(result.heading, rescue_library::algorithms::Heading::Right);
    let moving: Vec<_> = rig
        .drive
        .commands()
        .into_iter()
        .filter(|c| *c != (0, 0))
        .collect();
    assert_eq!(moving, vec![(-40, 40), (40, -40), (40, -40)]);
    assert_eq!(rig.drive.current(), (0, 0));
    assert_eq!(state.phase(), RescuePhase::Seeking);
    // 600 + 100 + 600 + 100 + 400
    assert_eq!(rig.now(), 1800);
}

#[test]
fn test_louder_left_pivots_left() {
    let rig = TestRig::new(0);
    let drive = rig.drive.clone();
    rig.sound
        .script(move || if drive.current().0 < 0 { 200 } else { 30 });

    let state = Arc::new(SharedState::new());
    let engine = ScanEngine::new(
        rig.hardware(),
        state.clone(),
        ScanSettings::default(),
        FusionSettings::default(),
    );
    let ticket = state.try_begin_rescue(TARGET).unwrap();

    let result = engine.scan_and_pivot(&ticket, &ScanProfile::brief()).unwrap();

    assert!(result.left.value() > result.right.value());
    assert_eq!(result.heading, rescue_library::algorithms::Heading::Left);
    let last_moving = rig
        .drive
        .commands()
        .into_iter()
        .rev()
        .find(|c| *c != (0, 0));
    assert_eq!(last_moving, Some((-35, 35)));
    // Brief profile settles only between the windows
    assert_eq!(rig.now(), 300 + 50 + 300 + 250);
}

#[test]
fn test_scan_side_stops_motion_when_aborted() {
    let rig = TestRig::new(80);
    let state = Arc::new(SharedState::new());
    let engine = ScanEngine::new(
        rig.hardware(),
        state.clone(),
        ScanSettings::default(),
        FusionSettings::default(),
    );
    let ticket = state.try_begin_rescue(TARGET).unwrap();

    let aborter = state.clone();
    at_time(&rig, 100, move || {
        aborter.abort_rescue();
    });

    let result = engine.scan_side(&ticket, -40, 40, 600);

    assert_eq!(result, Err(Interrupt::Cancelled));
    assert_eq!(rig.drive.current(), (0, 0));
    assert!(rig.now() <= 110);
}

#[test]
fn test_quiet_target_stops_early() {
    let rig = TestRig::new(10);
    let robot = robot(102, &rig, &RescueConfig::default());

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Completed(ApproachOutcome::QuietStop));
    // Quiet for 500 ms after the approach began at 2000, before any rescan
    assert!(rig.now() >= 2500 && rig.now() < 2800, "stopped at {}", rig.now());
    assert!(!rig.drive.commands().contains(&(-35, 35)));
    assert_eq!(rig.drive.current(), (0, 0));
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
}

#[test]
fn test_quiet_timer_restarts_after_rescan() {
    let rig = TestRig::new(100);
    let mut config = RescueConfig::default();
    config.approach.quiet_stop_ms = 600;
    let robot = robot(120, &rig, &config);

    // Target falls silent 500 ms into the approach
    let clock = rig.clock.clone();
    rig.sound
        .script(move || if clock.now_ms() < 2500 { 100 } else { 30 });

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Completed(ApproachOutcome::QuietStop));
    // Quiet from 2500, rescan 2800..3700, first poll after it at 3720, then a
    // full 600 ms of quiet
    assert_eq!(rig.now(), 3720 + 600);
    assert!(rig.drive.commands().contains(&(-35, 35)));
}

#[test]
fn test_strong_beacon_counts_as_arrival() {
    let rig = TestRig::new(100);
    let mut config = RescueConfig::default();
    config.approach.arrival_signal = Some(-50);
    let robot = robot(103, &rig, &config);

    let handler = robot.handler().clone();
    rig.clock.on_advance(move |_| {
        handler.handle(ReceivedMessage::new(beacon(7), -45), None);
    });

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Completed(ApproachOutcome::Arrived));
    assert_eq!(rig.now(), 2000);
}

#[test]
fn test_done_from_target_stops_approach() {
    let rig = TestRig::new(100);
    let robot = robot(104, &rig, &RescueConfig::default());

    let handler = robot.handler().clone();
    let fired_at = at_time(&rig, 3000, move || {
        assert_eq!(
            handler.handle(ReceivedMessage::new(done(7), -60), None),
            Handled::TargetReleased
        );
    });

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Cancelled);
    let released = fired_at.load(Ordering::SeqCst);
    assert!(released >= 3000);
    assert!(rig.now() - released <= 20, "kept going until {}", rig.now());
    assert_eq!(rig.drive.current(), (0, 0));
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Calm));
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
    assert_eq!(robot.state().target(), None);
}

#[test]
fn test_done_right_after_pivot_leaves_calm_face() {
    let rig = TestRig::new(100);
    let robot = robot(119, &rig, &RescueConfig::default());

    // Done lands the moment the pivot stops the wheels, before the
    // approach begins
    let handler = robot.handler().clone();
    let clock = rig.clock.clone();
    let mut sent = false;
    rig.drive.on_stop(move || {
        if !sent && clock.now_ms() >= 2000 {
            sent = true;
            handler.handle(ReceivedMessage::new(done(7), -60), None);
        }
    });

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Cancelled);
    assert_eq!(rig.now(), 2000);
    assert_eq!(robot.state().status(), SelfStatus::Healthy);
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Calm));
    assert_eq!(rig.indicator.sounds(), 0, "no empathy after release");
    assert_eq!(rig.drive.current(), (0, 0));
}

/// Score of one 100 ms window at `loudness`, after `record` ran and
/// `age_ms` passed
fn window_score(loudness: i32, record: impl Fn(&SharedState, u64), age_ms: u64) -> f64 {
    let rig = TestRig::new(loudness);
    let state = Arc::new(SharedState::new());
    let engine = ScanEngine::new(
        rig.hardware(),
        state.clone(),
        ScanSettings::default(),
        FusionSettings::default(),
    );
    let ticket = state.try_begin_rescue(TARGET).unwrap();
    record(&state, rig.now());
    rig.clock.advance(age_ms);
    engine.scan_side(&ticket, -40, 40, 100).unwrap().value()
}

#[test]
fn test_scan_side_uses_only_fresh_tracked_beacons() {
    let fusion = FusionSettings::default();
    let sound_only = fusion.sound_weight * f64::from(normalize_sound(100));
    let with_beacon = sound_only + fusion.signal_weight * f64::from(normalize_signal(-70));

    let fresh = window_score(100, |state, now| assert!(state.record_beacon(TARGET, -70, now)), 0);
    assert_relative_eq!(fresh, with_beacon);

    let stale = window_score(
        100,
        |state, now| assert!(state.record_beacon(TARGET, -70, now)),
        fusion.beacon_timeout_ms + 100,
    );
    assert_relative_eq!(stale, sound_only);

    // Someone else's beacon while the target is tracked
    let other = window_score(
        100,
        |state, now| assert!(!state.record_beacon(DeviceId(8), -50, now)),
        0,
    );
    assert_relative_eq!(other, sound_only);
}

#[test]
fn test_distress_interrupts_rescue() {
    let rig = TestRig::new(100);
    let robot = robot(105, &rig, &RescueConfig::default());

    let accelerometer = rig.accelerometer.clone();
    let monitor = robot.distress().clone();
    at_time(&rig, 3000, move || {
        accelerometer.set(-1000);
        assert_eq!(monitor.poll_orientation(), Some(SelfStatus::Distressed));
    });

    let outcome = robot.orchestrator().rescue(TARGET);

    assert_eq!(outcome, RescueOutcome::Interrupted);
    assert_eq!(robot.state().status(), SelfStatus::Distressed);
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
    assert_eq!(rig.drive.current(), (0, 0));
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Distress));
    assert_eq!(rig.radio.sent_count(MessageKind::Alert), 1);
}

#[test]
fn test_distressed_robot_declines() {
    let rig = TestRig::new(100);
    let robot = robot(106, &rig, &RescueConfig::default());
    assert!(robot.distress().enter_distress());

    assert_eq!(robot.orchestrator().rescue(TARGET), RescueOutcome::Declined);
    assert_eq!(
        robot.handler().handle(ReceivedMessage::new(alert(9), -60), None),
        Handled::Ignored
    );
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
    assert!(rig.drive.commands().iter().all(|c| *c == (0, 0)));
}

#[test]
fn test_alert_claims_once() {
    let rig = TestRig::new(100);
    let robot = robot(107, &rig, &RescueConfig::default());

    let first = robot
        .handler()
        .handle(ReceivedMessage::new(alert(9), -70), None);
    let Handled::RescueRequested(ticket) = first else {
        panic!("expected a rescue request, got {:?}", first);
    };
    assert_eq!(ticket.target(), DeviceId(9));
    assert_eq!(robot.state().phase(), RescuePhase::Scanning);

    // Busy: a second alert is dropped, not queued
    assert_eq!(
        robot.handler().handle(ReceivedMessage::new(alert(10), -50), None),
        Handled::Ignored
    );
    assert_eq!(robot.state().target(), Some(DeviceId(9)));
}

#[test]
fn test_beacons_from_others_are_ignored() {
    let rig = TestRig::new(100);
    let robot = robot(108, &rig, &RescueConfig::default());
    robot.state().try_begin_rescue(TARGET).unwrap();

    assert_eq!(
        robot.handler().handle(ReceivedMessage::new(beacon(8), -50), None),
        Handled::Ignored
    );
    assert_eq!(robot.state().track().last_seen_at, None);

    rig.clock.advance(30);
    assert_eq!(
        robot.handler().handle(ReceivedMessage::new(beacon(7), -62), None),
        Handled::BeaconRecorded
    );
    let track = robot.state().track();
    assert_eq!(track.last_seen_signal, -62);
    assert_eq!(track.last_seen_at, Some(30));

    // Done from a bystander changes nothing
    assert_eq!(
        robot.handler().handle(ReceivedMessage::new(done(8), -50), None),
        Handled::Ignored
    );
    assert_eq!(robot.state().target(), Some(TARGET));
}

#[test]
fn test_own_broadcasts_are_ignored() {
    let rig = TestRig::new(100);
    let robot = robot(109, &rig, &RescueConfig::default());

    assert_eq!(
        robot.handler().handle(ReceivedMessage::new(alert(109), -42), None),
        Handled::Ignored
    );
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
}

#[test]
fn test_undecodable_packet_is_dropped() {
    let rig = TestRig::new(100);
    let robot = robot(110, &rig, &RescueConfig::default());

    let packet = RawPacket {
        payload: vec![0xde, 0xad],
        signal_strength: -60,
    };
    assert_eq!(robot.handler().handle_packet(&packet, None), Handled::Ignored);
    assert_eq!(robot.state().phase(), RescuePhase::Idle);
}

#[test]
fn test_enter_and_exit_are_idempotent() {
    let rig = TestRig::new(100);
    let robot = robot(111, &rig, &RescueConfig::default());
    let monitor = robot.distress();

    assert!(monitor.enter_distress());
    assert!(!monitor.enter_distress());
    assert_eq!(rig.radio.sent_count(MessageKind::Alert), 1);
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Distress));

    assert!(monitor.exit_distress());
    assert!(!monitor.exit_distress());
    assert_eq!(rig.radio.sent_count(MessageKind::Done), 1);
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Calm));
    assert_eq!(robot.state().status(), SelfStatus::Healthy);
}

#[test]
fn test_flip_thresholds_have_hysteresis() {
    let rig = TestRig::new(100);
    let robot = robot(112, &rig, &RescueConfig::default());
    let monitor = robot.distress();

    rig.accelerometer.set(-500);
    assert_eq!(monitor.poll_orientation(), None);
    rig.accelerometer.set(-700);
    assert_eq!(monitor.poll_orientation(), Some(SelfStatus::Distressed));

    // Between the thresholds: stays distressed
    rig.accelerometer.set(100);
    assert_eq!(monitor.poll_orientation(), None);
    assert_eq!(monitor.status(), SelfStatus::Distressed);

    rig.accelerometer.set(300);
    assert_eq!(monitor.poll_orientation(), Some(SelfStatus::Healthy));
}

#[test]
fn test_manual_trigger_holds_distress() {
    let rig = TestRig::new(100);
    let robot = robot(113, &rig, &RescueConfig::default());
    let trigger = common::MockTrigger::default();
    robot.attach_manual_trigger(&trigger);

    trigger.fire();
    assert_eq!(robot.state().status(), SelfStatus::Distressed);
    assert!(robot.distress().is_pinned());

    // Upright, but still inside the hold
    rig.clock.advance(2990);
    assert_eq!(robot.distress().poll_orientation(), None);
    assert_eq!(robot.state().status(), SelfStatus::Distressed);

    rig.clock.advance(10);
    assert_eq!(
        robot.distress().poll_orientation(),
        Some(SelfStatus::Healthy)
    );
    assert!(!robot.distress().is_pinned());
    assert_eq!(rig.radio.sent_count(MessageKind::Done), 1);
}

#[test]
fn test_manual_hold_expiring_upside_down_stays_distressed() {
    let rig = TestRig::new(100);
    let robot = robot(114, &rig, &RescueConfig::default());
    let monitor = robot.distress();

    assert!(monitor.manual_trigger());
    // Already distressed: a second trigger does not extend the hold
    assert!(!monitor.manual_trigger());

    rig.accelerometer.set(-900);
    rig.clock.advance(3000);
    assert_eq!(monitor.poll_orientation(), None);
    assert_eq!(monitor.status(), SelfStatus::Distressed);
    assert!(!monitor.is_pinned());

    rig.accelerometer.set(900);
    assert_eq!(monitor.poll_orientation(), Some(SelfStatus::Healthy));
}

#[test]
fn test_beacon_round_broadcasts_while_distressed() {
    let rig = TestRig::new(100);
    let mut config = RescueConfig::default();
    config.distress.alert_resend_probability = 1.0;
    let robot = robot(115, &rig, &config);
    let monitor = robot.distress();

    assert!(!monitor.beacon_round());
    assert!(rig.radio.sent().is_empty());

    monitor.enter_distress();
    for _ in 0..3 {
        assert!(monitor.beacon_round());
    }

    assert_eq!(rig.radio.sent_count(MessageKind::Beacon), 3);
    assert_eq!(rig.radio.sent_count(MessageKind::Alert), 4);
    assert_eq!(rig.indicator.sounds(), 3);
    assert!(rig
        .radio
        .sent()
        .iter()
        .all(|m| m.sender == DeviceId(115)));
}

#[test]
fn test_alert_resend_can_be_disabled() {
    let rig = TestRig::new(100);
    let mut config = RescueConfig::default();
    config.distress.alert_resend_probability = 0.0;
    let robot = robot(116, &rig, &config);

    robot.distress().enter_distress();
    for _ in 0..10 {
        robot.distress().beacon_round();
    }

    assert_eq!(rig.radio.sent_count(MessageKind::Alert), 1);
    assert_eq!(rig.radio.sent_count(MessageKind::Beacon), 10);
}

#[test]
fn test_radio_configured_on_assembly() {
    let rig = TestRig::new(100);
    let _robot = robot(117, &rig, &RescueConfig::default());
    assert_eq!(rig.radio.configured(), Some((17, 7)));
    assert_eq!(rig.indicator.mode(), Some(IndicatorMode::Calm));
}

#[test]
fn test_invalid_config_rejected() {
    let rig = TestRig::new(100);
    let mut config = RescueConfig::default();
    config.fusion.sound_weight = 0.9;
    assert!(Robot::new(DeviceId(118), rig.hardware(), &config).is_err());
    assert_eq!(rig.radio.configured(), None);
}

#[test]
fn test_sim_clock_is_shared() {
    let rig = TestRig::new(100);
    let hardware = rig.hardware();
    hardware.sleep_ms(25);
    assert_eq!(rig.clock.now_ms(), 25);
}
