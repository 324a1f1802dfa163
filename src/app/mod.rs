//! Application layer: port traits, control-surface commands, structured
//! events, and the [`ControlStation`](service::ControlStation) that owns the
//! sequence runner and health registry.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
