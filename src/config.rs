//! Station configuration parameters.
//!
//! All tunable parameters for the ground-support station. Values can be
//! overridden by a JSON file passed on the command line.

use serde::{Deserialize, Serialize};

use crate::telemetry::PtChannel;

/// Core station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop interval (milliseconds). One runner tick per interval.
    pub control_loop_interval_ms: u32,
    /// Nominal sensor sampling period (milliseconds).
    pub sample_interval_ms: u32,

    // --- Pressure limits (PSI) ---
    /// PT1 (OPD_02) abort limit.
    pub pt1_limit_psi: f32,
    /// PT2 (FPD_02) abort limit.
    pub pt2_limit_psi: f32,
    /// PT3 (EPD_01) abort limit.
    pub pt3_limit_psi: f32,

    // --- Coil ---
    /// Coil speed used when a sequence entry selects the coil-speed target
    /// without a manual override (milliseconds).
    pub coil_speed_default_ms: u16,

    // --- Link ---
    /// Bound on any single send/receive on the controller link
    /// (milliseconds). Expiry marks the link bad instead of stalling.
    pub link_timeout_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            control_loop_interval_ms: 100, // 10 Hz
            sample_interval_ms: 100,

            // Pressure limits
            pt1_limit_psi: 350.0,
            pt2_limit_psi: 530.0,
            pt3_limit_psi: 825.0,

            // Coil
            coil_speed_default_ms: 50,

            // Link
            link_timeout_ms: 250,
        }
    }
}

impl SystemConfig {
    /// Abort limit for a channel, or `None` for monitoring-only channels.
    pub fn pt_limit(&self, channel: PtChannel) -> Option<f32> {
        match channel {
            PtChannel::Pt1 => Some(self.pt1_limit_psi),
            PtChannel::Pt2 => Some(self.pt2_limit_psi),
            PtChannel::Pt3 => Some(self.pt3_limit_psi),
            PtChannel::Pt4 | PtChannel::Pt5 => None,
        }
    }
}
