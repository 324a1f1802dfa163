//! Sequence runner — the test-sequence execution engine.
//!
//! A cursor walks the time-ordered [`CommandTable`] against elapsed run
//! time. Each control tick dispatches every entry that has come due, in
//! table order, to the [`ActuatorPort`]; entries sharing an offset dispatch
//! within the same tick, and a late tick catches up rather than skipping.
//!
//! ```text
//!            load(table)              start(now)
//!   IDLE ◀──────────────── IDLE ─────────────────▶ RUNNING
//!    ▲                                                │ tick(now)
//!    │ cursor reached end (complete)                  │
//!    └────────────────────────────────────────────────┤
//!                                                     │ abort(reason)
//!                 reset()                             ▼
//!   IDLE ◀──────────────────────────────────────── ABORTED (latched)
//! ```
//!
//! Abort is the safety override: one `all_off()` call, table cleared,
//! cursor zeroed, and the runner latches in `Aborted` until an explicit
//! `reset()`. Completion also drives the actuators off, but is a distinct
//! terminal outcome observers can tell apart from an abort.

use std::time::Instant;

use log::{error, info, warn};

use crate::actuators::{ActuatorStates, ValveState};
use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink};
use crate::config::SystemConfig;
use crate::error::{AbortReason, Error, Result};
use crate::health::{HealthRegistry, StatKey, Status};
use crate::sequence::{Action, CommandEntry, CommandTable, Target};
use crate::telemetry::{PtChannel, SensorSample};

// ---------------------------------------------------------------------------
// Runner state
// ---------------------------------------------------------------------------

/// The runner's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// No sequence executing. A table may be loaded and ready to start.
    Idle,
    /// Walking the table against elapsed time.
    Running,
    /// Abort latched. `reset()` is required before any new load or start —
    /// an abort is never silently recoverable by pressing START again.
    Aborted,
}

// ---------------------------------------------------------------------------
// Sequence runner
// ---------------------------------------------------------------------------

pub struct SequenceRunner {
    config: SystemConfig,
    table: Option<CommandTable>,
    cursor: usize,
    state: RunnerState,
    start_time: Option<Instant>,
}

impl SequenceRunner {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            config: config.clone(),
            table: None,
            cursor: 0,
            state: RunnerState::Idle,
            start_time: None,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunnerState::Running
    }

    /// Index of the next entry to dispatch.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a table is loaded and non-empty.
    pub fn has_sequence(&self) -> bool {
        self.table.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Seconds since start, or `None` when not running.
    pub fn elapsed_secs(&self, now: Instant) -> Option<f32> {
        self.start_time
            .filter(|_| self.state == RunnerState::Running)
            .map(|t0| now.duration_since(t0).as_secs_f32())
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Replace the loaded table. Rejected while running or abort-latched.
    pub fn load(&mut self, table: CommandTable, sink: &mut impl EventSink) -> Result<()> {
        match self.state {
            RunnerState::Running => Err(Error::SequenceBusy),
            RunnerState::Aborted => Err(Error::AbortLatched),
            RunnerState::Idle => {
                sink.emit(&AppEvent::SequenceLoaded {
                    entries: table.len(),
                    duration_secs: table.duration_secs(),
                });
                info!(
                    "Runner: sequence loaded ({} commands, {:.1}s span)",
                    table.len(),
                    table.duration_secs()
                );
                self.table = Some(table);
                self.cursor = 0;
                Ok(())
            }
        }
    }

    /// Begin executing the loaded table at `now`.
    pub fn start(
        &mut self,
        now: Instant,
        health: &mut HealthRegistry,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match self.state {
            RunnerState::Running => return Err(Error::SequenceBusy),
            RunnerState::Aborted => return Err(Error::AbortLatched),
            RunnerState::Idle => {}
        }
        let entries = match &self.table {
            Some(t) if !t.is_empty() => t.len(),
            _ => return Err(Error::NoSequenceLoaded),
        };

        self.cursor = 0;
        self.start_time = Some(now);
        self.state = RunnerState::Running;
        health.set(StatKey::TestCommand, Status::Good);
        sink.emit(&AppEvent::SequenceStarted { entries });
        info!("Runner: sequence started ({entries} commands)");
        Ok(())
    }

    /// Leave the aborted state. No-op when idle; rejected while running.
    pub fn reset(&mut self) -> Result<()> {
        match self.state {
            RunnerState::Running => Err(Error::SequenceBusy),
            RunnerState::Idle => Ok(()),
            RunnerState::Aborted => {
                info!("Runner: abort latch cleared");
                self.state = RunnerState::Idle;
                Ok(())
            }
        }
    }

    // ── Tick ──────────────────────────────────────────────────

    /// Advance against elapsed time, dispatching every due entry in table
    /// order. Ties on offset dispatch within this call; a late tick
    /// dispatches everything owed, it never skips. Reaching the end of the
    /// table completes the sequence (distinct from abort).
    pub fn tick(
        &mut self,
        now: Instant,
        sample: &SensorSample,
        hw: &mut impl ActuatorPort,
        states: &mut ActuatorStates,
        health: &mut HealthRegistry,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.state != RunnerState::Running {
            return Ok(());
        }
        let Some(start) = self.start_time else {
            return Err(Error::InternalConsistency("running with no start time"));
        };
        let elapsed = now.duration_since(start).as_secs_f32();

        loop {
            if self.state != RunnerState::Running {
                // An abort entry (or safety trip) ended the sequence
                // mid-tick; nothing queued after all_off() may dispatch.
                return Ok(());
            }
            let entry = match &self.table {
                Some(t) if self.cursor < t.len() => {
                    let e = t.entries()[self.cursor];
                    if e.offset_secs > elapsed {
                        break;
                    }
                    e
                }
                _ => break,
            };
            self.cursor += 1;
            self.dispatch(entry, sample, hw, states, health, sink)?;
        }

        // Cursor past the last entry with no abort: sequence complete.
        let done = self
            .table
            .as_ref()
            .is_some_and(|t| self.cursor >= t.len());
        if done && self.state == RunnerState::Running {
            self.complete(elapsed, hw, states, health, sink);
        }
        Ok(())
    }

    /// Abort: drive everything off and latch. Callable from any state,
    /// at any cursor position, including mid-tick.
    pub fn abort(
        &mut self,
        reason: AbortReason,
        hw: &mut impl ActuatorPort,
        states: &mut ActuatorStates,
        health: &mut HealthRegistry,
        sink: &mut impl EventSink,
    ) {
        warn!("Runner: ABORT ({reason})");

        if let Err(e) = hw.all_off() {
            // The local state still latches safe; the link key records
            // that the hardware may not have confirmed.
            error!("Runner: all_off failed during abort: {e}");
            health.set(StatKey::LinkMessageTx, Status::Bad);
        }
        if let AbortReason::PressureLimit { channel, .. } = reason {
            if let Some(key) = abort_pt_key(channel) {
                health.set(key, Status::Bad);
            }
        }

        *states = ActuatorStates::all_off();
        self.table = None;
        self.cursor = 0;
        self.start_time = None;
        self.state = RunnerState::Aborted;
        sink.emit(&AppEvent::Aborted { reason });
    }

    // ── Internal ──────────────────────────────────────────────

    fn complete(
        &mut self,
        elapsed: f32,
        hw: &mut impl ActuatorPort,
        states: &mut ActuatorStates,
        health: &mut HealthRegistry,
        sink: &mut impl EventSink,
    ) {
        // Force-close on completion as well: the stand must never be left
        // energised just because the author forgot a trailing CLOSE.
        if let Err(e) = hw.all_off() {
            error!("Runner: all_off failed at completion: {e}");
            health.set(StatKey::LinkMessageTx, Status::Bad);
        }
        *states = ActuatorStates::all_off();
        self.cursor = 0;
        self.start_time = None;
        self.state = RunnerState::Idle;
        sink.emit(&AppEvent::SequenceComplete {
            elapsed_secs: elapsed,
        });
        info!("Runner: sequence complete after {elapsed:.1}s");
    }

    fn dispatch(
        &mut self,
        entry: CommandEntry,
        sample: &SensorSample,
        hw: &mut impl ActuatorPort,
        states: &mut ActuatorStates,
        health: &mut HealthRegistry,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match (entry.target, entry.action) {
            (Target::Valve(valve), Action::Open) => {
                // Safety gate: never open into an over-pressure line.
                if let Some(reason) = pressure_violation(&self.config, sample) {
                    self.abort(reason, hw, states, health, sink);
                    return Ok(());
                }
                let result = hw.open_valve(valve);
                health.set_outcome(StatKey::valve_command(valve), result.is_ok());
                match result {
                    Ok(()) => states.set_valve(valve, ValveState::Open),
                    Err(e) => warn!("Runner: {valve} open failed: {e}"),
                }
            }

            (Target::Valve(valve), Action::Close) => {
                let result = hw.close_valve(valve);
                health.set_outcome(StatKey::valve_command(valve), result.is_ok());
                match result {
                    Ok(()) => states.set_valve(valve, ValveState::Closed),
                    Err(e) => warn!("Runner: {valve} close failed: {e}"),
                }
            }

            (Target::Coil, Action::Start | Action::None) => {
                let result = hw.spark();
                health.set_outcome(StatKey::CoilOnCommand, result.is_ok());
                match result {
                    Ok(()) => states.coil.sparked = true,
                    Err(e) => warn!("Runner: spark failed: {e}"),
                }
            }

            (Target::CoilSpeed, Action::Start | Action::None) => {
                let ms = self.config.coil_speed_default_ms;
                let result = hw.set_coil_speed(ms);
                health.set_outcome(StatKey::CoilSpeedCommand, result.is_ok());
                match result {
                    Ok(()) => states.coil.speed_ms = ms,
                    Err(e) => warn!("Runner: coil speed failed: {e}"),
                }
            }

            (Target::Abort, Action::None) => {
                self.abort(AbortReason::SequenceCommand, hw, states, health, sink);
                return Ok(());
            }

            (Target::Read(channel), Action::Read) => {
                let psi = sample.pt(channel);
                health.set(StatKey::pt_feedback(channel), Status::Reading(psi));
                sink.emit(&AppEvent::PressureReading { channel, psi });
            }

            // Validation admits none of these; reaching one means the
            // loaded table did not come through the loader.
            (target, action) => {
                error!("Runner: unreachable dispatch {target}/{action} — halting sequence");
                if let Err(e) = hw.all_off() {
                    error!("Runner: all_off failed during halt: {e}");
                }
                *states = ActuatorStates::all_off();
                self.table = None;
                self.cursor = 0;
                self.start_time = None;
                self.state = RunnerState::Aborted;
                return Err(Error::InternalConsistency(
                    "dispatch reached a target/action pairing validation rejects",
                ));
            }
        }

        sink.emit(&AppEvent::CommandDispatched {
            offset_secs: entry.offset_secs,
            target: entry.target,
            action: entry.action,
        });
        Ok(())
    }
}

/// Check every limited transducer against its configured abort limit.
/// Shared by the runner's open gate and the station's manual-open gate.
pub(crate) fn pressure_violation(
    config: &SystemConfig,
    sample: &SensorSample,
) -> Option<AbortReason> {
    for channel in PtChannel::LIMITED {
        let Some(limit_psi) = config.pt_limit(channel) else {
            continue;
        };
        let reading_psi = sample.pt(channel);
        if reading_psi >= limit_psi {
            return Some(AbortReason::PressureLimit {
                channel,
                reading_psi,
                limit_psi,
            });
        }
    }
    None
}

/// Abort-point feedback key for a limited transducer.
fn abort_pt_key(channel: PtChannel) -> Option<StatKey> {
    match channel {
        PtChannel::Pt1 => Some(StatKey::AbortPt1),
        PtChannel::Pt2 => Some(StatKey::AbortPt2),
        PtChannel::Pt3 => Some(StatKey::AbortPt3),
        PtChannel::Pt4 | PtChannel::Pt5 => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
