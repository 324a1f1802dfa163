//! Outbound application events.
//!
//! The runner and control station emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them — write to the session log, feed the
//! dashboard, or record them in a test.

use crate::actuators::{ValveId, ValveState};
use crate::error::AbortReason;
use crate::sequence::{Action, Target};
use crate::telemetry::{PtChannel, SensorSample};

/// Structured events emitted by the sequencing core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A sequence was validated and loaded (entry count, total span).
    SequenceLoaded { entries: usize, duration_secs: f32 },

    /// A loaded sequence began executing.
    SequenceStarted { entries: usize },

    /// One table entry was dispatched to the actuators.
    CommandDispatched {
        offset_secs: f32,
        target: Target,
        action: Action,
    },

    /// The cursor reached the end of the table. Distinct from an abort.
    SequenceComplete { elapsed_secs: f32 },

    /// The runner aborted and drove all actuators off.
    Aborted { reason: AbortReason },

    /// A `Read` entry sampled a transducer.
    PressureReading { channel: PtChannel, psi: f32 },

    /// A manual (non-sequence) valve command was applied.
    ManualValve { valve: ValveId, state: ValveState },

    /// Periodic telemetry snapshot for external consumers.
    Telemetry(SensorSample),
}
