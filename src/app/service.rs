//! Control station — the single owner of station state.
//!
//! One [`ControlStation`] is built at startup around a rig (hardware link or
//! simulator) and an event sink. Everything mutable lives here: the sequence
//! runner, the health registry, the actuator-state mirror, and the latest
//! sensor sample. All of it is driven from one control loop calling
//! [`tick`](ControlStation::tick) at the configured interval, so no state
//! needs a lock.
//!
//! Tick order, every interval:
//!   1. drain the command queue — aborts first, then the rest in arrival
//!      order (and nothing at all once an abort has run this tick);
//!   2. acquire one sensor sample (a failed read keeps the previous sample
//!      and marks the link key bad);
//!   3. advance the sequence runner against elapsed time.

use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

use log::{info, warn};

use crate::actuators::{ActuatorStates, ValveId, ValveState};
use crate::config::SystemConfig;
use crate::error::{AbortReason, Error, Result};
use crate::health::{HealthRegistry, StatKey, Status};
use crate::runner::{self, RunnerState, SequenceRunner};
use crate::sequence::{loader, CommandTable};
use crate::telemetry::{PtChannel, SensorSample};

use super::commands::{command_queue, CommandHandle, StationCommand};
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink, SamplePort};

/// The application service. Generic over the rig and the event sink so the
/// same control path runs against hardware, the simulator, and test mocks.
pub struct ControlStation<R, E>
where
    R: ActuatorPort + SamplePort,
    E: EventSink,
{
    config: SystemConfig,
    rig: R,
    sink: E,
    runner: SequenceRunner,
    health: HealthRegistry,
    states: ActuatorStates,
    latest: SensorSample,
    commands: mpsc::Receiver<StationCommand>,
    handle: CommandHandle,
}

impl<R, E> ControlStation<R, E>
where
    R: ActuatorPort + SamplePort,
    E: EventSink,
{
    /// Build the station around an already-connected rig. Constructing with
    /// a live rig is what "init link connection" means here, so the key is
    /// recorded good immediately.
    pub fn new(config: SystemConfig, rig: R, sink: E) -> Self {
        let (handle, commands) = command_queue();
        let mut health = HealthRegistry::new();
        health.set(StatKey::InitLinkConnection, Status::Good);
        Self {
            runner: SequenceRunner::new(&config),
            config,
            rig,
            sink,
            health,
            states: ActuatorStates::all_off(),
            latest: SensorSample::default(),
            commands,
            handle,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// A cloneable producer handle for external surfaces.
    pub fn handle(&self) -> CommandHandle {
        self.handle.clone()
    }

    pub fn runner_state(&self) -> RunnerState {
        self.runner.state()
    }

    pub fn latest_sample(&self) -> SensorSample {
        self.latest
    }

    pub fn valve_state(&self, valve: ValveId) -> ValveState {
        self.states.valve(valve)
    }

    pub fn actuator_states(&self) -> ActuatorStates {
        self.states
    }

    /// Every tracked health key with its status, in declaration order.
    pub fn health_snapshot(&self) -> Vec<(&'static str, Status)> {
        self.health.snapshot()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Borrow the rig. Adapters expose state of their own (the hardware
    /// rig's controller abort flags, the simulator's reset).
    pub fn rig(&self) -> &R {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut R {
        &mut self.rig
    }

    /// Borrow the event sink (recording sinks are read back in tests).
    pub fn sink(&self) -> &E {
        &self.sink
    }

    // ── Sequence lifecycle ────────────────────────────────────

    /// Validate and load a sequence file. Nothing is loaded on error.
    pub fn load_sequence(&mut self, path: &Path) -> Result<()> {
        let table = loader::load_file(path)?;
        self.load_table(table)
    }

    /// Load an already-validated table.
    pub fn load_table(&mut self, table: CommandTable) -> Result<()> {
        self.runner.load(table, &mut self.sink)
    }

    /// Start the loaded sequence at `now`.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        self.runner.start(now, &mut self.health, &mut self.sink)
    }

    /// Abort immediately: one all-off command, sequence terminated, runner
    /// latched until [`reset`](Self::reset).
    pub fn abort(&mut self, reason: AbortReason) {
        self.runner.abort(
            reason,
            &mut self.rig,
            &mut self.states,
            &mut self.health,
            &mut self.sink,
        );
    }

    /// Clear the abort latch.
    pub fn reset(&mut self) -> Result<()> {
        self.runner.reset()
    }

    // ── Manual control surface ────────────────────────────────

    /// Flip one valve. Opens pass through the same pressure gate as
    /// sequence dispatch; a violation aborts instead of opening.
    pub fn toggle_valve(&mut self, valve: ValveId) -> Result<()> {
        if self.runner.state() == RunnerState::Aborted {
            return Err(Error::AbortLatched);
        }
        let next = self.states.valve(valve).toggled();
        if next == ValveState::Open {
            if let Some(reason) = runner::pressure_violation(&self.config, &self.latest) {
                warn!("Station: manual open of {valve} refused, aborting: {reason}");
                self.abort(reason);
                return Ok(());
            }
        }

        let result = match next {
            ValveState::Open => self.rig.open_valve(valve),
            ValveState::Closed => self.rig.close_valve(valve),
        };
        self.health
            .set_outcome(StatKey::valve_command(valve), result.is_ok());
        match result {
            Ok(()) => {
                self.states.set_valve(valve, next);
                self.sink.emit(&AppEvent::ManualValve { valve, state: next });
                info!("Station: manual {valve} -> {next:?}");
                Ok(())
            }
            Err(e) => {
                warn!("Station: manual {valve} command failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Fire the coil once.
    pub fn spark(&mut self) -> Result<()> {
        if self.runner.state() == RunnerState::Aborted {
            return Err(Error::AbortLatched);
        }
        let result = self.rig.spark();
        self.health
            .set_outcome(StatKey::CoilOnCommand, result.is_ok());
        match result {
            Ok(()) => {
                self.states.coil.sparked = true;
                Ok(())
            }
            Err(e) => {
                warn!("Station: spark failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Set the coil speed/duration (milliseconds).
    pub fn set_coil_speed(&mut self, ms: u16) -> Result<()> {
        if self.runner.state() == RunnerState::Aborted {
            return Err(Error::AbortLatched);
        }
        let result = self.rig.set_coil_speed(ms);
        self.health
            .set_outcome(StatKey::CoilSpeedCommand, result.is_ok());
        match result {
            Ok(()) => {
                self.states.coil.speed_ms = ms;
                Ok(())
            }
            Err(e) => {
                warn!("Station: coil speed failed: {e}");
                Err(e.into())
            }
        }
    }

    // ── Control loop ──────────────────────────────────────────

    /// One control tick. Infallible link trouble is absorbed into health
    /// keys; the only error out of here is an internal-consistency halt
    /// from the runner.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        self.drain_commands(now);
        self.acquire_sample();

        let sample = self.latest;
        self.runner.tick(
            now,
            &sample,
            &mut self.rig,
            &mut self.states,
            &mut self.health,
            &mut self.sink,
        )
    }

    /// Drain the queue. Aborts execute before anything else that arrived
    /// this tick, and once one has run the remaining backlog is dropped —
    /// nothing may dispatch after all-off.
    fn drain_commands(&mut self, now: Instant) {
        let mut pending = Vec::new();
        while let Ok(cmd) = self.commands.try_recv() {
            pending.push(cmd);
        }
        if pending.iter().any(|c| *c == StationCommand::Abort) {
            let dropped = pending.len() - 1;
            if dropped > 0 {
                warn!("Station: abort queued; dropping {dropped} other pending command(s)");
            }
            self.abort(AbortReason::Operator);
            return;
        }
        for cmd in pending {
            let result = match cmd {
                StationCommand::Start => self.start(now),
                StationCommand::ToggleValve(v) => self.toggle_valve(v),
                StationCommand::SetCoilSpeed(ms) => self.set_coil_speed(ms),
                StationCommand::Spark => self.spark(),
                StationCommand::Abort => unreachable!("aborts handled above"),
            };
            if let Err(e) = result {
                // Queue commands are fire-and-forget; the outcome lands in
                // the health registry and the log.
                warn!("Station: queued {cmd:?} rejected: {e}");
            }
        }
    }

    /// Pull one sample from the rig. On failure the previous sample stays
    /// current and the receive key goes bad.
    fn acquire_sample(&mut self) {
        match self.rig.sample() {
            Ok(sample) => {
                self.latest = sample;
                self.health.set(StatKey::LinkMessageRx, Status::Good);
                self.health
                    .set(StatKey::LcFb, Status::Reading(sample.thrust));
                for channel in [
                    PtChannel::Pt1,
                    PtChannel::Pt2,
                    PtChannel::Pt3,
                    PtChannel::Pt4,
                    PtChannel::Pt5,
                ] {
                    self.health.set(
                        StatKey::pt_feedback(channel),
                        Status::Reading(sample.pt(channel)),
                    );
                }
                self.sink.emit(&AppEvent::Telemetry(sample));
            }
            Err(e) => {
                warn!("Station: sample failed, keeping previous: {e}");
                self.health.set(StatKey::LinkMessageRx, Status::Bad);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::sequence::{Action, CommandEntry, Target};
    use std::time::Duration;

    struct StubRig {
        opened: Vec<ValveId>,
        closed: Vec<ValveId>,
        all_offs: usize,
        sample: SensorSample,
        fail_sample: bool,
    }

    impl StubRig {
        fn new() -> Self {
            Self {
                opened: Vec::new(),
                closed: Vec::new(),
                all_offs: 0,
                sample: SensorSample::default(),
                fail_sample: false,
            }
        }
    }

    impl ActuatorPort for StubRig {
        fn open_valve(&mut self, valve: ValveId) -> core::result::Result<(), LinkError> {
            self.opened.push(valve);
            Ok(())
        }
        fn close_valve(&mut self, valve: ValveId) -> core::result::Result<(), LinkError> {
            self.closed.push(valve);
            Ok(())
        }
        fn set_coil_speed(&mut self, _ms: u16) -> core::result::Result<(), LinkError> {
            Ok(())
        }
        fn spark(&mut self) -> core::result::Result<(), LinkError> {
            Ok(())
        }
        fn all_off(&mut self) -> core::result::Result<(), LinkError> {
            self.all_offs += 1;
            Ok(())
        }
    }

    impl SamplePort for StubRig {
        fn sample(&mut self) -> core::result::Result<SensorSample, LinkError> {
            if self.fail_sample {
                Err(LinkError::Timeout)
            } else {
                Ok(self.sample)
            }
        }
    }

    struct NullSink;
    impl EventSink for NullSink {
        fn emit(&mut self, _event: &AppEvent) {}
    }

    fn station() -> ControlStation<StubRig, NullSink> {
        ControlStation::new(SystemConfig::default(), StubRig::new(), NullSink)
    }

    fn one_entry_table() -> CommandTable {
        CommandTable::from_entries(vec![CommandEntry {
            offset_secs: 0.0,
            target: Target::Valve(ValveId::V1),
            action: Action::Open,
        }])
    }

    #[test]
    fn init_link_recorded_on_construction() {
        let s = station();
        assert_eq!(
            s.health_snapshot()[StatKey::InitLinkConnection as usize].1,
            Status::Good
        );
    }

    #[test]
    fn failed_sample_keeps_previous_and_marks_rx_bad() {
        let mut s = station();
        s.rig.sample.pt2 = 42.0;
        let t0 = Instant::now();
        s.tick(t0).unwrap();
        assert_eq!(s.latest_sample().pt2, 42.0);

        s.rig.fail_sample = true;
        s.rig.sample.pt2 = 99.0;
        s.tick(t0 + Duration::from_millis(100)).unwrap();
        assert_eq!(s.latest_sample().pt2, 42.0, "previous sample retained");
        assert_eq!(
            s.health_snapshot()[StatKey::LinkMessageRx as usize].1,
            Status::Bad
        );
    }

    #[test]
    fn queued_abort_preempts_queued_start() {
        let mut s = station();
        s.load_table(one_entry_table()).unwrap();
        let h = s.handle();
        h.submit(StationCommand::Start);
        h.submit(StationCommand::Abort);
        s.tick(Instant::now()).unwrap();

        assert_eq!(s.runner_state(), RunnerState::Aborted);
        assert!(s.rig.opened.is_empty(), "start never ran");
        assert_eq!(s.rig.all_offs, 1);
    }

    #[test]
    fn manual_toggle_round_trip() {
        let mut s = station();
        s.toggle_valve(ValveId::V3).unwrap();
        assert_eq!(s.valve_state(ValveId::V3), ValveState::Open);
        s.toggle_valve(ValveId::V3).unwrap();
        assert_eq!(s.valve_state(ValveId::V3), ValveState::Closed);
        assert_eq!(s.rig.opened, vec![ValveId::V3]);
        assert_eq!(s.rig.closed, vec![ValveId::V3]);
    }

    #[test]
    fn manual_open_over_limit_aborts() {
        let mut s = station();
        s.rig.sample.pt1 = 400.0; // limit 350
        s.tick(Instant::now()).unwrap();

        let before = s.rig.opened.len();
        s.toggle_valve(ValveId::V2).unwrap();
        assert_eq!(s.rig.opened.len(), before, "open refused");
        assert_eq!(s.runner_state(), RunnerState::Aborted);
    }

    #[test]
    fn manual_control_rejected_while_latched() {
        let mut s = station();
        s.abort(AbortReason::Operator);
        assert_eq!(s.toggle_valve(ValveId::V1), Err(Error::AbortLatched));
        assert_eq!(s.spark(), Err(Error::AbortLatched));
        assert_eq!(s.set_coil_speed(80), Err(Error::AbortLatched));

        s.reset().unwrap();
        assert!(s.toggle_valve(ValveId::V1).is_ok());
    }

    #[test]
    fn sequence_runs_through_tick() {
        let mut s = station();
        s.load_table(one_entry_table()).unwrap();
        let t0 = Instant::now();
        s.start(t0).unwrap();
        s.tick(t0).unwrap();
        assert_eq!(s.rig.opened, vec![ValveId::V1]);
        // Single-entry table completes on the same tick.
        assert_eq!(s.runner_state(), RunnerState::Idle);
    }
}
