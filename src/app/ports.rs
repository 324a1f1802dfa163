//! Port traits — the boundary between the sequencing core and the stand.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlStation / SequenceRunner
//! ```
//!
//! Driven adapters (the hardware link, the simulator, event sinks)
//! implement these traits. The core consumes them via generics and never
//! touches a socket or a byte frame directly, so the whole sequencing path
//! runs under test with mock rigs.

use crate::actuators::ValveId;
use crate::error::LinkError;
use crate::telemetry::SensorSample;

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the runner and control surface command actuators
/// through this. Every method must complete in bounded time; transport
/// stalls surface as [`LinkError`], never as a blocked control loop.
pub trait ActuatorPort {
    /// Command a valve open.
    fn open_valve(&mut self, valve: ValveId) -> Result<(), LinkError>;

    /// Command a valve closed.
    fn close_valve(&mut self, valve: ValveId) -> Result<(), LinkError>;

    /// Set the coil speed/duration (milliseconds).
    fn set_coil_speed(&mut self, ms: u16) -> Result<(), LinkError>;

    /// Fire the ignition coil.
    fn spark(&mut self) -> Result<(), LinkError>;

    /// Drive every actuator to its safe state with a single command.
    /// The unique entry point used by abort; O(1) in valve count.
    fn all_off(&mut self) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Sample port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one sensor sample per control tick.
///
/// Hardware implementations decode one inbound packet per call and return
/// `Err(LinkError::MalformedPacket)` on framing failures; the caller keeps
/// its previous sample and marks the link bad. Simulated implementations
/// are infinite and restartable.
pub trait SamplePort {
    fn sample(&mut self) -> Result<SensorSample, LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / dashboard)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s through
/// this port. Adapters decide where they go — the log, a dashboard feed, a
/// test recorder. This replaces the legacy habit of hijacking stdout.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
