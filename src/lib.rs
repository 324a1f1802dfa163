//! Ground-support control and telemetry station for the BLP liquid-propellant
//! test stand.
//!
//! The crate is organised hexagonally: a sequencing core that never touches
//! I/O, port traits at the boundary, and adapters for the real controller
//! link and for a deterministic simulator.
//!
//! ```text
//!   sequence file ──▶ sequence::loader ──▶ CommandTable
//!                                               │ load/start
//!   CommandHandle ──▶ app::ControlStation ──▶ runner::SequenceRunner
//!                         │        │                  │ dispatch
//!                         │        ▼                  ▼
//!                         │   HealthRegistry     ActuatorPort ◀── adapters
//!                         ▼                                        (hardware,
//!                     EventSink ──▶ log / dashboard                 sim)
//! ```
//!
//! Everything stateful is owned by one [`app::service::ControlStation`] and
//! driven from a single control loop; aborts drive one all-off command and
//! latch the runner until an explicit reset.

pub mod actuators;
pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod health;
pub mod link;
pub mod runner;
pub mod sequence;
pub mod telemetry;

pub use app::service::ControlStation;
pub use config::SystemConfig;
pub use error::{AbortReason, Error, LinkError, Result, ValidationError};
pub use runner::{RunnerState, SequenceRunner};
pub use sequence::CommandTable;
pub use telemetry::{PtChannel, SensorSample};
