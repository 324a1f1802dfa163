//! Unified error types for the ground-support station.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! control loop's error handling uniform. Abort reasons are a separate type:
//! an abort is a commanded outcome, not a failure, but the reason must stay
//! distinguishable all the way to the operator.

use core::fmt;

use crate::telemetry::PtChannel;

// ---------------------------------------------------------------------------
// Top-level station error
// ---------------------------------------------------------------------------

/// Every fallible operation in the station funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The sequence file failed validation; nothing was loaded.
    Validation(ValidationError),
    /// Load or start rejected because a sequence is currently running.
    SequenceBusy,
    /// Start requested with no sequence loaded (or an empty one).
    NoSequenceLoaded,
    /// The runner is latched in its aborted state; `reset()` is required
    /// before any new load or start.
    AbortLatched,
    /// A transport failure. Marks the relevant health key bad; never fatal
    /// to the runner.
    Link(LinkError),
    /// A table entry reached dispatch that validation should have rejected.
    /// Indicates a loader/runner mismatch; halts sequence execution.
    InternalConsistency(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::SequenceBusy => write!(f, "sequence is running"),
            Self::NoSequenceLoaded => write!(f, "no sequence loaded"),
            Self::AbortLatched => write!(f, "abort latched; reset required"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::InternalConsistency(msg) => write!(f, "internal consistency: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sequence-file validation errors
// ---------------------------------------------------------------------------

/// Rejections produced while loading a sequence file. Row numbers are
/// 1-based data rows (the header row is not counted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required column is absent from the file header.
    MissingColumn(&'static str),
    /// The file contains no command rows.
    EmptySequence,
    /// A `Time` value is lower than the row before it.
    NonMonotonicTime { row: usize },
    /// A `Time` value failed to parse or is negative.
    BadTime { row: usize, value: String },
    /// The `Function` column holds a name outside the recognised set.
    UnknownFunction { row: usize, name: String },
    /// The `Action` column holds a value outside the recognised set.
    UnknownAction { row: usize, name: String },
    /// The action is recognised but not valid for the row's function
    /// (e.g. `Spark` with `CLOSE`).
    ActionMismatch {
        row: usize,
        function: String,
        action: String,
    },
    /// The file could not be read or parsed as CSV.
    Io(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn(col) => write!(f, "missing required column '{col}'"),
            Self::EmptySequence => write!(f, "sequence contains no commands"),
            Self::NonMonotonicTime { row } => {
                write!(f, "row {row}: Time values must be non-decreasing")
            }
            Self::BadTime { row, value } => {
                write!(f, "row {row}: bad Time value '{value}'")
            }
            Self::UnknownFunction { row, name } => {
                write!(f, "row {row}: unknown function '{name}'")
            }
            Self::UnknownAction { row, name } => {
                write!(f, "row {row}: unknown action '{name}'")
            }
            Self::ActionMismatch { row, function, action } => {
                write!(f, "row {row}: action '{action}' is not valid for '{function}'")
            }
            Self::Io(msg) => write!(f, "I/O: {msg}"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

/// Transport failures on the controller link. All are recoverable: the
/// offending health key goes `bad` and the loop keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Could not establish the connection.
    ConnectFailed,
    /// A bounded send or receive timed out.
    Timeout,
    /// The write completed partially or the peer rejected it.
    SendFailed,
    /// An inbound packet failed framing or field decode.
    MalformedPacket,
    /// The peer closed the connection.
    Closed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::Timeout => write!(f, "timed out"),
            Self::SendFailed => write!(f, "send failed"),
            Self::MalformedPacket => write!(f, "malformed packet"),
            Self::Closed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Abort reasons
// ---------------------------------------------------------------------------

/// Why the runner aborted. Carried in the abort event so the operator can
/// tell a safety trip from a commanded stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbortReason {
    /// The operator pressed ABORT (or an external controller requested it).
    Operator,
    /// A `BLP_Abort` entry in the sequence itself was dispatched.
    SequenceCommand,
    /// A tracked pressure reading exceeded its configured limit.
    PressureLimit {
        channel: PtChannel,
        reading_psi: f32,
        limit_psi: f32,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => write!(f, "operator abort"),
            Self::SequenceCommand => write!(f, "sequence abort command"),
            Self::PressureLimit { channel, reading_psi, limit_psi } => write!(
                f,
                "pressure limit exceeded: {channel} at {reading_psi:.1} PSI (limit {limit_psi:.0})"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Station-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
