//! Command table — the immutable, time-ordered list of sequence commands.
//!
//! A sequence file is parsed into [`RawRow`]s by the loader front-end and
//! validated here into a [`CommandTable`]. Validation resolves every
//! function name to a closed [`Target`] variant once, at load time, so the
//! runner never does string lookups and can treat an unknown target at
//! dispatch as an internal-consistency fault rather than a runtime surprise.

pub mod loader;

use core::fmt;

use crate::actuators::ValveId;
use crate::error::ValidationError;
use crate::telemetry::PtChannel;

// ---------------------------------------------------------------------------
// Targets and actions
// ---------------------------------------------------------------------------

/// What a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// One of the four stand valves.
    Valve(ValveId),
    /// The ignition coil (spark).
    Coil,
    /// The coil speed/duration setting.
    CoilSpeed,
    /// The stand abort line.
    Abort,
    /// A pressure-transducer readout.
    Read(PtChannel),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valve(v) => write!(f, "{v}"),
            Self::Coil => write!(f, "Spark"),
            Self::CoilSpeed => write!(f, "CoilSpeed"),
            Self::Abort => write!(f, "BLP_Abort"),
            Self::Read(ch) => write!(f, "Read {ch}"),
        }
    }
}

/// What a command does to its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    Open,
    Close,
    Start,
    Read,
    /// The sequence file's empty action cell.
    #[default]
    None,
}

impl Action {
    fn parse(s: &str) -> Option<Action> {
        match s.trim() {
            "OPEN" => Some(Self::Open),
            "CLOSE" => Some(Self::Close),
            "START" => Some(Self::Start),
            "READ" => Some(Self::Read),
            "" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "OPEN",
            Self::Close => "CLOSE",
            Self::Start => "START",
            Self::Read => "READ",
            Self::None => "-",
        };
        write!(f, "{s}")
    }
}

/// Resolve a sequence-file function name to its target. The recognised set
/// is fixed; anything else fails validation.
fn resolve_function(name: &str) -> Option<Target> {
    match name.trim() {
        "NV_02" => Some(Target::Valve(ValveId::V1)),
        "FV_02" => Some(Target::Valve(ValveId::V2)),
        "FV_03" => Some(Target::Valve(ValveId::V3)),
        "OV_03" => Some(Target::Valve(ValveId::V4)),
        "Spark" => Some(Target::Coil),
        "BLP_Abort" => Some(Target::Abort),
        "Read_OPD_02" => Some(Target::Read(PtChannel::Pt1)),
        "Read_FPD_02" => Some(Target::Read(PtChannel::Pt2)),
        "Read_EPD_01" => Some(Target::Read(PtChannel::Pt3)),
        _ => None,
    }
}

/// Action pairings each target accepts.
fn pairing_is_valid(target: Target, action: Action) -> bool {
    match target {
        Target::Valve(_) => matches!(action, Action::Open | Action::Close),
        // Spark rows carry START or an empty cell; both fire the coil.
        Target::Coil => matches!(action, Action::Start | Action::None),
        Target::CoilSpeed => matches!(action, Action::Start | Action::None),
        Target::Abort => action == Action::None,
        Target::Read(_) => action == Action::Read,
    }
}

// ---------------------------------------------------------------------------
// Entries and table
// ---------------------------------------------------------------------------

/// One unvalidated sequence-file row, as produced by the loader front-end.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub time: String,
    pub function: String,
    pub action: String,
}

/// One validated, dispatchable command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandEntry {
    /// Seconds after sequence start at which this command becomes due.
    pub offset_secs: f32,
    pub target: Target,
    pub action: Action,
}

/// An immutable, time-ordered command list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Validate raw rows into a table.
    ///
    /// Checks, in order per row: the time parses and is non-negative, times
    /// never decrease, the function is recognised, the action is recognised,
    /// and the pairing is legal. Errors name the offending 1-based data row.
    pub fn load(rows: &[RawRow]) -> Result<CommandTable, ValidationError> {
        if rows.is_empty() {
            return Err(ValidationError::EmptySequence);
        }

        let mut entries = Vec::with_capacity(rows.len());
        let mut last_offset = 0.0_f32;

        for (i, raw) in rows.iter().enumerate() {
            let row = i + 1;

            let offset_secs: f32 = raw
                .time
                .trim()
                .parse()
                .ok()
                .filter(|t: &f32| t.is_finite() && *t >= 0.0)
                .ok_or_else(|| ValidationError::BadTime {
                    row,
                    value: raw.time.clone(),
                })?;

            if offset_secs < last_offset {
                return Err(ValidationError::NonMonotonicTime { row });
            }
            last_offset = offset_secs;

            let target = resolve_function(&raw.function).ok_or_else(|| {
                ValidationError::UnknownFunction {
                    row,
                    name: raw.function.clone(),
                }
            })?;

            let action = Action::parse(&raw.action).ok_or_else(|| {
                ValidationError::UnknownAction {
                    row,
                    name: raw.action.clone(),
                }
            })?;

            if !pairing_is_valid(target, action) {
                return Err(ValidationError::ActionMismatch {
                    row,
                    function: raw.function.trim().to_string(),
                    action: raw.action.trim().to_string(),
                });
            }

            entries.push(CommandEntry {
                offset_secs,
                target,
                action,
            });
        }

        Ok(CommandTable { entries })
    }

    /// Build a table directly from entries. Used by tests and the manual
    /// control surface; entries must already be time-ordered.
    pub fn from_entries(entries: Vec<CommandEntry>) -> CommandTable {
        debug_assert!(
            entries.windows(2).all(|w| w[0].offset_secs <= w[1].offset_secs),
            "entries must be time-ordered"
        );
        CommandTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, idx: usize) -> Option<&CommandEntry> {
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Total span of the sequence in seconds (0 for an empty table).
    pub fn duration_secs(&self) -> f32 {
        self.entries.last().map_or(0.0, |e| e.offset_secs)
    }
}
