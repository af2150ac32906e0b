//! Session lifecycle tests
//!
//! Verifies level resolution at start, scoped release of the loudness source,
//! error propagation, and the event side channel.


use std::sync::{Arc, Mutex};
use test_helpers::{FakeSink, ScriptedSource};
use volnorm_control::{
    Action, AdaptiveTuning, ControlEvent, LevelTable, Policy, Session, VolnormError,
};

fn start(
    level: &str,
    script: impl IntoIterator<Item = i32>,
) -> (
    volnorm_core::Result<Session<ScriptedSource, FakeSink>>,
    Arc<Mutex<test_helpers::SourceLog>>,
) {
    let (source, log) = ScriptedSource::new(script);
    let session = Session::start(
        &LevelTable::builtin(),
        level,
        source,
        FakeSink::new(5, 0, 15),
        AdaptiveTuning::default(),
    );
    (session, log)
}

#[test]
fn unknown_level_fails_without_enabling_capture() {
    let (session, log) = start("Ear-splitting", [-4000]);

    assert!(matches!(session, Err(VolnormError::UnknownLevel(_))));
    let log = log.lock().unwrap();
    assert_eq!(log.enables, 0);
    assert_eq!(log.disables, 0);
}

#[test]
fn capture_failure_at_enable_is_propagated() {
    let (source, log) = ScriptedSource::failing_enable();
    let session = Session::start(
        &LevelTable::builtin(),
        "Medium",
        source,
        FakeSink::new(5, 0, 15),
        AdaptiveTuning::default(),
    );

    assert!(matches!(session, Err(VolnormError::Capture(_))));
    assert_eq!(log.lock().unwrap().disables, 0);
}

#[test]
fn ticks_follow_the_script() {
    let (session, _) = start("medium", [-7000, -4000, -1000, -9600]);
    let mut session = session.unwrap();

    let actions: Vec<Action> = (0..4).map(|_| session.tick().unwrap().action).collect();

    assert_eq!(
        actions,
        vec![Action::Raise, Action::Hold, Action::Lower, Action::Hold]
    );
    assert_eq!(session.ticks(), 4);
    assert_eq!(session.policy(), Policy::fixed(-6000, -3000).unwrap());
}

#[test]
fn capture_error_mid_session_is_returned_unchanged() {
    let (session, _) = start("Medium", [-4000]);
    let mut session = session.unwrap();

    session.tick().unwrap();
    let err = session.tick().unwrap_err();

    assert!(matches!(err, VolnormError::Capture(msg) if msg == "script exhausted"));
    assert!(session.is_active());
}

#[test]
fn stop_releases_source_exactly_once() {
    let (session, log) = start("Dynamic", [-5000, -5000]);
    let mut session = session.unwrap();
    session.tick().unwrap();

    session.stop();
    session.stop();
    drop(session);

    let log = log.lock().unwrap();
    assert_eq!(log.enables, 1);
    assert_eq!(log.disables, 1);
}

#[test]
fn drop_without_stop_still_releases() {
    let (session, log) = start("Low", [-5000]);
    drop(session.unwrap());
    assert_eq!(log.lock().unwrap().disables, 1);
}

#[test]
fn tick_after_stop_is_rejected() {
    let (session, log) = start("High", [-5000, -5000]);
    let mut session = session.unwrap();
    session.stop();

    assert!(matches!(session.tick(), Err(VolnormError::SessionStopped)));
    assert_eq!(log.lock().unwrap().measures, 0);
}

#[test]
fn listener_sees_start_ticks_and_stop() {
    let (session, _) = start("Medium", [-7000, -4000]);
    let mut session = session.unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.set_listener(move |event| sink.lock().unwrap().push(event.clone()));

    session.tick().unwrap();
    session.tick().unwrap();
    session.stop();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert!(matches!(&events[0], ControlEvent::SessionStarted { level, .. } if level == "Medium"));
    assert!(
        matches!(&events[1], ControlEvent::Tick(status) if status.action == Action::Raise && status.peak == Some(-5500))
    );
    assert!(matches!(&events[2], ControlEvent::Tick(status) if status.tick == 2));
    assert!(matches!(events[3], ControlEvent::SessionStopped { ticks: 2 }));
}

#[test]
fn external_volume_change_is_reported() {
    // The sink shares its volume with the test, which moves it like a user would
    let (source, _) = ScriptedSource::new([-5000, -5000]);
    let mut session = Session::with_policy(
        "Dynamic",
        Policy::Adaptive,
        source,
        SharedSink::new(5),
        AdaptiveTuning::default(),
    )
    .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    session.set_listener(move |event| recorded.lock().unwrap().push(event.clone()));

    session.tick().unwrap();
    session.controller().sink().set(9);
    let status = session.tick().unwrap();

    assert_eq!(status.external_change.map(|v| v.value()), Some(5));
    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        ControlEvent::ExternalVolumeChange { expected, found }
            if expected.value() == 5 && found.value() == 9
    )));
}

/// Sink whose volume can be changed from outside the session
struct SharedSink {
    volume: Arc<Mutex<i32>>,
}

impl SharedSink {
    fn new(volume: i32) -> Self {
        Self {
            volume: Arc::new(Mutex::new(volume)),
        }
    }

    fn set(&self, volume: i32) {
        *self.volume.lock().unwrap() = volume;
    }
}

impl volnorm_core::VolumeSink for SharedSink {
    fn volume(&self) -> volnorm_core::Result<volnorm_core::VolumeLevel> {
        Ok(volnorm_core::VolumeLevel(*self.volume.lock().unwrap()))
    }

    fn min_volume(&self) -> volnorm_core::Result<volnorm_core::VolumeLevel> {
        Ok(volnorm_core::VolumeLevel(0))
    }

    fn max_volume(&self) -> volnorm_core::Result<volnorm_core::VolumeLevel> {
        Ok(volnorm_core::VolumeLevel(15))
    }

    fn raise(&mut self) -> volnorm_core::Result<()> {
        *self.volume.lock().unwrap() += 1;
        Ok(())
    }

    fn lower(&mut self) -> volnorm_core::Result<()> {
        *self.volume.lock().unwrap() -= 1;
        Ok(())
    }
}
