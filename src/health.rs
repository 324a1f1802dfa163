//! System health registry.
//!
//! Single source of truth for the last-known status of every tracked
//! measurement and command outcome. The tracked-name set is closed at
//! compile time: [`StatKey`] is an enum, so writing an unrecognised key is
//! unrepresentable rather than silently ignored.
//!
//! Two kinds of key live in one registry — commands issued by the station
//! software and feedback signals from the controller — merged into a single
//! read view. Entries default to [`Status::Null`] until first observed and
//! are never deleted during a run; the registry is created once at process
//! start and reset only at process restart.

use core::fmt;

use crate::actuators::ValveId;
use crate::telemetry::PtChannel;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Whether a key tracks a software-issued command or hardware feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Command,
    Feedback,
}

/// Every measurement and command outcome the station tracks.
///
/// Declaration order is the snapshot order; keep it stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatKey {
    // -- Software command outcomes --
    InitLinkConnection = 0,
    LinkMessageTx = 1,
    LinkMessageRx = 2,
    V1OpenCommand = 3,
    V2OpenCommand = 4,
    V3OpenCommand = 5,
    V4OpenCommand = 6,
    CoilOnCommand = 7,
    CoilSpeedCommand = 8,
    TestCommand = 9,

    // -- Hardware feedback --
    Valve1Fb = 10,
    Valve2Fb = 11,
    Valve3Fb = 12,
    Valve4Fb = 13,
    CoilFb = 14,
    Pt1Fb = 15,
    Pt2Fb = 16,
    Pt3Fb = 17,
    Pt4Fb = 18,
    Pt5Fb = 19,
    LcFb = 20,
    AbortPt1 = 21,
    AbortPt2 = 22,
    AbortPt3 = 23,
}

impl StatKey {
    /// Total number of tracked keys — sizes the registry array.
    pub const COUNT: usize = 24;

    /// Every key, in declaration (snapshot) order.
    pub const ALL: [StatKey; Self::COUNT] = [
        Self::InitLinkConnection,
        Self::LinkMessageTx,
        Self::LinkMessageRx,
        Self::V1OpenCommand,
        Self::V2OpenCommand,
        Self::V3OpenCommand,
        Self::V4OpenCommand,
        Self::CoilOnCommand,
        Self::CoilSpeedCommand,
        Self::TestCommand,
        Self::Valve1Fb,
        Self::Valve2Fb,
        Self::Valve3Fb,
        Self::Valve4Fb,
        Self::CoilFb,
        Self::Pt1Fb,
        Self::Pt2Fb,
        Self::Pt3Fb,
        Self::Pt4Fb,
        Self::Pt5Fb,
        Self::LcFb,
        Self::AbortPt1,
        Self::AbortPt2,
        Self::AbortPt3,
    ];

    /// Display name, matching the stand's measurement list.
    pub fn name(self) -> &'static str {
        match self {
            Self::InitLinkConnection => "init link connection",
            Self::LinkMessageTx => "link message tx",
            Self::LinkMessageRx => "link message rx",
            Self::V1OpenCommand => "v1 open command",
            Self::V2OpenCommand => "v2 open command",
            Self::V3OpenCommand => "v3 open command",
            Self::V4OpenCommand => "v4 open command",
            Self::CoilOnCommand => "coil on command",
            Self::CoilSpeedCommand => "coil speed command",
            Self::TestCommand => "test command",
            Self::Valve1Fb => "valve 1 fb",
            Self::Valve2Fb => "valve 2 fb",
            Self::Valve3Fb => "valve 3 fb",
            Self::Valve4Fb => "valve 4 fb",
            Self::CoilFb => "coil fb",
            Self::Pt1Fb => "pt 1 fb",
            Self::Pt2Fb => "pt 2 fb",
            Self::Pt3Fb => "pt 3 fb",
            Self::Pt4Fb => "pt 4 fb",
            Self::Pt5Fb => "pt 5 fb",
            Self::LcFb => "lc fb",
            Self::AbortPt1 => "abort pt 1",
            Self::AbortPt2 => "abort pt 2",
            Self::AbortPt3 => "abort pt 3",
        }
    }

    /// Command outcome or hardware feedback.
    pub fn kind(self) -> StatKind {
        match self {
            Self::InitLinkConnection
            | Self::LinkMessageTx
            | Self::LinkMessageRx
            | Self::V1OpenCommand
            | Self::V2OpenCommand
            | Self::V3OpenCommand
            | Self::V4OpenCommand
            | Self::CoilOnCommand
            | Self::CoilSpeedCommand
            | Self::TestCommand => StatKind::Command,
            _ => StatKind::Feedback,
        }
    }

    /// The command key recording open/close outcomes for a valve.
    pub fn valve_command(valve: ValveId) -> StatKey {
        match valve {
            ValveId::V1 => Self::V1OpenCommand,
            ValveId::V2 => Self::V2OpenCommand,
            ValveId::V3 => Self::V3OpenCommand,
            ValveId::V4 => Self::V4OpenCommand,
        }
    }

    /// The feedback key holding the latest reading for a transducer.
    pub fn pt_feedback(channel: PtChannel) -> StatKey {
        match channel {
            PtChannel::Pt1 => Self::Pt1Fb,
            PtChannel::Pt2 => Self::Pt2Fb,
            PtChannel::Pt3 => Self::Pt3Fb,
            PtChannel::Pt4 => Self::Pt4Fb,
            PtChannel::Pt5 => Self::Pt5Fb,
        }
    }
}

// ---------------------------------------------------------------------------
// Status values
// ---------------------------------------------------------------------------

/// Last-known status of a tracked key.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Status {
    /// Not yet observed this run.
    #[default]
    Null,
    /// Last command/check succeeded.
    Good,
    /// Last command/check failed.
    Bad,
    /// Raw feedback value (pressure, thrust, ...).
    Reading(f32),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Good => write!(f, "good"),
            Self::Bad => write!(f, "bad"),
            Self::Reading(v) => write!(f, "{v:.1}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Process-wide status table. Created once at startup, passed by reference
/// to every component that reports into it; all writers run on the control
/// loop.
pub struct HealthRegistry {
    stats: [Status; StatKey::COUNT],
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            stats: [Status::Null; StatKey::COUNT],
        }
    }

    /// Record the latest status for a key.
    pub fn set(&mut self, key: StatKey, status: Status) {
        self.stats[key as usize] = status;
    }

    /// Shorthand for the common good/bad outcome of a command.
    pub fn set_outcome(&mut self, key: StatKey, ok: bool) {
        self.set(key, if ok { Status::Good } else { Status::Bad });
    }

    /// Last-known status for a key (`Null` if never observed).
    pub fn get(&self, key: StatKey) -> Status {
        self.stats[key as usize]
    }

    /// Return every key to `Null`. Process-restart semantics; during a run
    /// keys are only ever overwritten, never cleared.
    pub fn reset(&mut self) {
        self.stats = [Status::Null; StatKey::COUNT];
    }

    /// Every tracked key with its status, in declaration order.
    /// The order is deterministic so snapshots can be asserted against.
    pub fn snapshot(&self) -> Vec<(&'static str, Status)> {
        StatKey::ALL
            .iter()
            .map(|&k| (k.name(), self.get(k)))
            .collect()
    }

    /// Keys of one kind, in declaration order.
    pub fn by_kind(&self, kind: StatKind) -> impl Iterator<Item = (StatKey, Status)> + '_ {
        StatKey::ALL
            .into_iter()
            .filter(move |k| k.kind() == kind)
            .map(|k| (k, self.get(k)))
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}
