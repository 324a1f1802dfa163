//! End-to-end tests of the control station: sequence file in, framed
//! actuator commands and health outcomes out, with time under test control.

use std::io::Cursor;
use std::time::{Duration, Instant};

use blp_stand::actuators::{ValveId, ValveState};
use blp_stand::app::commands::StationCommand;
use blp_stand::app::events::AppEvent;
use blp_stand::app::ports::{ActuatorPort, EventSink, SamplePort};
use blp_stand::error::LinkError;
use blp_stand::health::{StatKey, Status};
use blp_stand::sequence::loader;
use blp_stand::{AbortReason, ControlStation, PtChannel, RunnerState, SensorSample, SystemConfig};

// ── Test doubles ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RigCall {
    Open(ValveId),
    Close(ValveId),
    Spark,
    CoilSpeed(u16),
    AllOff,
}

/// Rig double: records every actuator command and replays scripted samples,
/// holding the last one once the script runs out.
struct MockRig {
    calls: Vec<RigCall>,
    script: Vec<Result<SensorSample, LinkError>>,
    cursor: usize,
}

impl MockRig {
    fn quiet() -> Self {
        Self::scripted(vec![Ok(SensorSample::default())])
    }

    fn scripted(script: Vec<Result<SensorSample, LinkError>>) -> Self {
        assert!(!script.is_empty());
        Self {
            calls: Vec::new(),
            script,
            cursor: 0,
        }
    }
}

impl ActuatorPort for MockRig {
    fn open_valve(&mut self, valve: ValveId) -> Result<(), LinkError> {
        self.calls.push(RigCall::Open(valve));
        Ok(())
    }
    fn close_valve(&mut self, valve: ValveId) -> Result<(), LinkError> {
        self.calls.push(RigCall::Close(valve));
        Ok(())
    }
    fn set_coil_speed(&mut self, ms: u16) -> Result<(), LinkError> {
        self.calls.push(RigCall::CoilSpeed(ms));
        Ok(())
    }
    fn spark(&mut self) -> Result<(), LinkError> {
        self.calls.push(RigCall::Spark);
        Ok(())
    }
    fn all_off(&mut self) -> Result<(), LinkError> {
        self.calls.push(RigCall::AllOff);
        Ok(())
    }
}

impl SamplePort for MockRig {
    fn sample(&mut self) -> Result<SensorSample, LinkError> {
        let at = self.cursor.min(self.script.len() - 1);
        self.cursor += 1;
        self.script[at]
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

type TestStation = ControlStation<MockRig, RecordingSink>;

fn station_with(rig: MockRig) -> TestStation {
    ControlStation::new(SystemConfig::default(), rig, RecordingSink::default())
}

fn station_events(station: &TestStation) -> &[AppEvent] {
    &station.sink().events
}

fn dispatched(events: &[AppEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, AppEvent::CommandDispatched { .. }))
        .count()
}

const SCENARIO_CSV: &str = "\
Time,Function,Action
0.0,NV_02,OPEN
0.0,Spark,START
1.5,Read_FPD_02,READ
2.0,NV_02,CLOSE
";

// ── Tests ─────────────────────────────────────────────────────

#[test]
fn csv_to_completion_end_to_end() {
    let sample = SensorSample {
        pt2: 212.0,
        ..Default::default()
    };
    let mut station = station_with(MockRig::scripted(vec![Ok(sample)]));

    let table = loader::load_reader(Cursor::new(SCENARIO_CSV)).unwrap();
    station.load_table(table).unwrap();

    let t0 = Instant::now();
    station.start(t0).unwrap();
    station.tick(t0).unwrap();
    station.tick(t0 + Duration::from_millis(1500)).unwrap();
    station.tick(t0 + Duration::from_secs(2)).unwrap();

    assert_eq!(station.runner_state(), RunnerState::Idle);
    let snap = station.health_snapshot();
    assert_eq!(snap[StatKey::V1OpenCommand as usize].1, Status::Good);
    assert_eq!(snap[StatKey::CoilOnCommand as usize].1, Status::Good);
    assert_eq!(snap[StatKey::TestCommand as usize].1, Status::Good);
    // The READ entry recorded PT2's live value.
    assert_eq!(snap[StatKey::Pt2Fb as usize].1, Status::Reading(212.0));
    assert!(station.actuator_states().is_safe());

    // On the wire: open, spark, close, then the completion all-off.
    assert_eq!(
        station.rig().calls,
        vec![
            RigCall::Open(ValveId::V1),
            RigCall::Spark,
            RigCall::Close(ValveId::V1),
            RigCall::AllOff,
        ]
    );
}

#[test]
fn events_tell_the_whole_story() {
    let mut station = station_with(MockRig::quiet());
    let table = loader::load_reader(Cursor::new(SCENARIO_CSV)).unwrap();
    station.load_table(table).unwrap();

    let t0 = Instant::now();
    station.start(t0).unwrap();
    // One late tick: everything is owed at once.
    station.tick(t0 + Duration::from_secs(5)).unwrap();

    let events = station_events(&station);
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::SequenceLoaded { entries: 4, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::SequenceStarted { entries: 4 })));
    assert_eq!(dispatched(events), 4);
    assert!(events
        .iter()
        .any(|e| matches!(e, AppEvent::SequenceComplete { .. })));
    assert!(!events.iter().any(|e| matches!(e, AppEvent::Aborted { .. })));
}

#[test]
fn queued_operator_abort_wins_over_everything_queued() {
    let mut station = station_with(MockRig::quiet());
    let table = loader::load_reader(Cursor::new(SCENARIO_CSV)).unwrap();
    station.load_table(table).unwrap();

    let handle = station.handle();
    handle.submit(StationCommand::Start);
    handle.submit(StationCommand::ToggleValve(ValveId::V2));
    handle.submit(StationCommand::Abort);

    station.tick(Instant::now()).unwrap();

    assert_eq!(station.runner_state(), RunnerState::Aborted);
    assert!(station.actuator_states().is_safe());
    assert_eq!(dispatched(station_events(&station)), 0);
    // The only thing that reached the rig is the safing command.
    assert_eq!(station.rig().calls, vec![RigCall::AllOff]);
}

#[test]
fn pressure_trip_mid_sequence_aborts_with_channel() {
    // PT3's limit is 825; the second scripted sample crosses it before the
    // 2.0 s valve-open comes due.
    let low = SensorSample {
        pt3: 400.0,
        ..Default::default()
    };
    let high = SensorSample {
        pt3: 900.0,
        ..Default::default()
    };
    let csv = "Time,Function,Action\n0.0,FV_02,OPEN\n2.0,FV_03,OPEN\n";

    let mut station = station_with(MockRig::scripted(vec![Ok(low), Ok(high)]));
    let table = loader::load_reader(Cursor::new(csv)).unwrap();
    station.load_table(table).unwrap();

    let t0 = Instant::now();
    station.start(t0).unwrap();
    station.tick(t0).unwrap();
    assert_eq!(station.runner_state(), RunnerState::Running);

    station.tick(t0 + Duration::from_secs(2)).unwrap();
    assert_eq!(station.runner_state(), RunnerState::Aborted);
    assert!(!station.rig().calls.contains(&RigCall::Open(ValveId::V3)));

    let events = station_events(&station);
    assert!(events.iter().any(|e| matches!(
        e,
        AppEvent::Aborted {
            reason: AbortReason::PressureLimit {
                channel: PtChannel::Pt3,
                ..
            }
        }
    )));
    assert_eq!(
        station.health_snapshot()[StatKey::AbortPt3 as usize].1,
        Status::Bad
    );
}

#[test]
fn link_dropout_keeps_last_sample_and_marks_rx() {
    let good = SensorSample {
        pt1: 77.0,
        ..Default::default()
    };
    let mut station = station_with(MockRig::scripted(vec![
        Ok(good),
        Err(LinkError::Timeout),
        Err(LinkError::MalformedPacket),
    ]));

    let t0 = Instant::now();
    station.tick(t0).unwrap();
    assert_eq!(
        station.health_snapshot()[StatKey::LinkMessageRx as usize].1,
        Status::Good
    );

    station.tick(t0 + Duration::from_millis(100)).unwrap();
    station.tick(t0 + Duration::from_millis(200)).unwrap();
    assert_eq!(station.latest_sample().pt1, 77.0, "previous sample holds");
    assert_eq!(
        station.health_snapshot()[StatKey::LinkMessageRx as usize].1,
        Status::Bad
    );
}

#[test]
fn abort_latch_survives_until_reset_then_station_recovers() {
    let mut station = station_with(MockRig::quiet());
    let table = loader::load_reader(Cursor::new(SCENARIO_CSV)).unwrap();
    station.load_table(table).unwrap();

    station.abort(AbortReason::Operator);
    assert_eq!(station.runner_state(), RunnerState::Aborted);

    // Start through the queue is rejected while latched (logged, dropped).
    station.handle().submit(StationCommand::Start);
    station.tick(Instant::now()).unwrap();
    assert_eq!(station.runner_state(), RunnerState::Aborted);

    station.reset().unwrap();
    let table = loader::load_reader(Cursor::new(SCENARIO_CSV)).unwrap();
    station.load_table(table).unwrap();
    let t0 = Instant::now();
    station.start(t0).unwrap();
    station.tick(t0 + Duration::from_secs(5)).unwrap();
    assert_eq!(station.runner_state(), RunnerState::Idle);
}

#[test]
fn manual_valves_update_mirror_and_health() {
    let mut station = station_with(MockRig::quiet());
    station.tick(Instant::now()).unwrap();

    station.toggle_valve(ValveId::V4).unwrap();
    assert_eq!(station.valve_state(ValveId::V4), ValveState::Open);
    assert_eq!(
        station.health_snapshot()[StatKey::V4OpenCommand as usize].1,
        Status::Good
    );

    station.toggle_valve(ValveId::V4).unwrap();
    assert_eq!(station.valve_state(ValveId::V4), ValveState::Closed);
    assert!(station.actuator_states().is_safe());
}
