//! Inbound control-surface commands.
//!
//! External surfaces (dashboard, terminal, scripts) never touch the runner
//! or registry directly: they enqueue a [`StationCommand`] through a
//! [`CommandHandle`], and the control loop drains the queue at the start of
//! each tick. Aborts jump the queue — see
//! [`ControlStation::tick`](super::service::ControlStation::tick).

use std::sync::mpsc;

use crate::actuators::ValveId;

/// Commands external surfaces can send into the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationCommand {
    /// Start the loaded sequence.
    Start,
    /// Abort: all actuators off, sequence terminated.
    Abort,
    /// Flip one valve between open and closed (manual control).
    ToggleValve(ValveId),
    /// Set the coil speed/duration (milliseconds).
    SetCoilSpeed(u16),
    /// Fire the coil once (manual control).
    Spark,
}

/// Cloneable producer half of the station's single-consumer command queue.
#[derive(Clone)]
pub struct CommandHandle {
    tx: mpsc::Sender<StationCommand>,
}

impl CommandHandle {
    /// Enqueue a command for the next control tick. Returns `false` if the
    /// station has shut down.
    pub fn submit(&self, cmd: StationCommand) -> bool {
        self.tx.send(cmd).is_ok()
    }
}

/// Build the queue pair: a handle for producers and the receiver the
/// station drains.
pub fn command_queue() -> (CommandHandle, mpsc::Receiver<StationCommand>) {
    let (tx, rx) = mpsc::channel();
    (CommandHandle { tx }, rx)
}
