//! Driven adapters: concrete implementations of the app-layer ports.
//!
//! [`hardware`] speaks the real controller protocol over a [`LinkPort`];
//! [`sim`] replays the stand's characteristic curves with no hardware at
//! all; [`log_sink`] routes structured events into the process log.
//!
//! [`LinkPort`]: crate::link::LinkPort

pub mod hardware;
pub mod log_sink;
pub mod sim;

pub use hardware::HardwareRig;
pub use log_sink::LogEventSink;
pub use sim::SimulatedRig;
