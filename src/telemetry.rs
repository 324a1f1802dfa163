//! Telemetry sample types.
//!
//! One [`SensorSample`] is produced per sampling tick — by the simulator or
//! by decoding one inbound packet — and consumed immediately by the runner's
//! safety check and by external plotting. The core never persists samples.

use core::fmt;

/// The pressure transducer channels on the stand.
///
/// PT1–PT3 sit on instrumented lines with hard abort limits; PT4 and PT5 are
/// monitoring-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtChannel {
    Pt1,
    Pt2,
    Pt3,
    Pt4,
    Pt5,
}

impl PtChannel {
    /// Transducers the safety gate checks before any valve-open dispatch.
    pub const LIMITED: [PtChannel; 3] = [Self::Pt1, Self::Pt2, Self::Pt3];

    /// The stand's P&ID designator for this transducer, where it has one.
    pub fn designator(self) -> Option<&'static str> {
        match self {
            Self::Pt1 => Some("OPD_02"),
            Self::Pt2 => Some("FPD_02"),
            Self::Pt3 => Some("EPD_01"),
            Self::Pt4 | Self::Pt5 => None,
        }
    }
}

impl fmt::Display for PtChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            Self::Pt1 => 1,
            Self::Pt2 => 2,
            Self::Pt3 => 3,
            Self::Pt4 => 4,
            Self::Pt5 => 5,
        };
        match self.designator() {
            Some(d) => write!(f, "PT{n} ({d})"),
            None => write!(f, "PT{n}"),
        }
    }
}

/// A point-in-time reading of every sensor on the stand.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    /// Load-cell thrust (lbf).
    pub thrust: f32,
    /// Pressure transducers 1–5 (PSI).
    pub pt1: f32,
    pub pt2: f32,
    pub pt3: f32,
    pub pt4: f32,
    pub pt5: f32,
}

impl SensorSample {
    /// Reading for a single channel.
    pub fn pt(&self, channel: PtChannel) -> f32 {
        match channel {
            PtChannel::Pt1 => self.pt1,
            PtChannel::Pt2 => self.pt2,
            PtChannel::Pt3 => self.pt3,
            PtChannel::Pt4 => self.pt4,
            PtChannel::Pt5 => self.pt5,
        }
    }
}
