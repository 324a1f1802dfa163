//! Actuator identity and state tracking.
//!
//! [`ActuatorStates`] is the station's mirror of the physical stand: which
//! valves are commanded open and what the coil was last told to do. It is
//! mutated only by the sequence runner's dispatch path and by manual
//! control-surface commands; the dashboard and health registry read it.
//!
//! Lifecycle: everything starts closed/off at process start and is driven
//! back to closed/off on every abort.

use core::fmt;

/// The four remotely operated valves on the stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValveId {
    V1 = 0,
    V2 = 1,
    V3 = 2,
    V4 = 3,
}

impl ValveId {
    pub const COUNT: usize = 4;
    pub const ALL: [ValveId; Self::COUNT] = [Self::V1, Self::V2, Self::V3, Self::V4];

    /// P&ID designator used on the stand drawings and in sequence files.
    pub fn designator(self) -> &'static str {
        match self {
            Self::V1 => "NV-02",
            Self::V2 => "FV-02",
            Self::V3 => "FV-03",
            Self::V4 => "OV-03",
        }
    }

    /// 1-based valve number, as used in health key names and wire commands.
    pub fn number(self) -> u8 {
        self as u8 + 1
    }
}

impl fmt::Display for ValveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.designator())
    }
}

/// Commanded position of a valve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValveState {
    Open,
    #[default]
    Closed,
}

impl ValveState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

/// Last-commanded coil settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoilState {
    /// Whether a spark has been commanded since the last reset/abort.
    pub sparked: bool,
    /// Configured speed/duration setting (milliseconds).
    pub speed_ms: u16,
}

impl Default for CoilState {
    fn default() -> Self {
        Self {
            sparked: false,
            speed_ms: 0,
        }
    }
}

/// Mirror of every actuator's commanded state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActuatorStates {
    valves: [ValveState; ValveId::COUNT],
    pub coil: CoilState,
}

impl ActuatorStates {
    /// Everything closed/off — the startup and post-abort state.
    pub fn all_off() -> Self {
        Self::default()
    }

    pub fn valve(&self, id: ValveId) -> ValveState {
        self.valves[id as usize]
    }

    pub fn set_valve(&mut self, id: ValveId, state: ValveState) {
        self.valves[id as usize] = state;
    }

    /// True when every valve is closed and the coil is quiescent.
    pub fn is_safe(&self) -> bool {
        self.valves.iter().all(|v| *v == ValveState::Closed) && !self.coil.sparked
    }
}
