//! Simulated rig.
//!
//! Deterministic stand-in for the controller: actuator commands are
//! accepted and logged, and each sample advances an internal counter
//! through the stand's characteristic curves. With the 10 Hz sampling
//! default the "test fire" profile spans about five wall-clock seconds
//! before thrust and PT1 saturate.

use log::debug;

use crate::app::ports::{ActuatorPort, SamplePort};
use crate::actuators::ValveId;
use crate::error::LinkError;
use crate::telemetry::SensorSample;

/// Samples per simulated second of test fire.
const TICKS_PER_FIRE_SECOND: f32 = 50.0;

/// Sensor full-scale ceiling (PSI / lbf percent).
const PT_CEILING: f32 = 850.0;
const THRUST_CEILING: f32 = 100.0;

#[derive(Debug, Default)]
pub struct SimulatedRig {
    counter: u32,
}

impl SimulatedRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind the profile to its start.
    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

impl ActuatorPort for SimulatedRig {
    fn open_valve(&mut self, valve: ValveId) -> Result<(), LinkError> {
        debug!("sim: open {valve}");
        Ok(())
    }

    fn close_valve(&mut self, valve: ValveId) -> Result<(), LinkError> {
        debug!("sim: close {valve}");
        Ok(())
    }

    fn set_coil_speed(&mut self, ms: u16) -> Result<(), LinkError> {
        debug!("sim: coil speed {ms} ms");
        Ok(())
    }

    fn spark(&mut self) -> Result<(), LinkError> {
        debug!("sim: spark");
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), LinkError> {
        debug!("sim: all off");
        Ok(())
    }
}

impl SamplePort for SimulatedRig {
    fn sample(&mut self) -> Result<SensorSample, LinkError> {
        self.counter += 1;
        let tf = self.counter as f32 / TICKS_PER_FIRE_SECOND;

        let pt1 = (100.0 * tf).min(PT_CEILING);
        Ok(SensorSample {
            thrust: (20.0 * tf).min(THRUST_CEILING),
            pt1,
            pt2: (80.0 * tf).min(PT_CEILING),
            pt3: (120.0 * tf).min(PT_CEILING),
            pt4: (400.0 + 50.0 * tf.sin()).min(PT_CEILING),
            pt5: 0.8 * pt1,
        })
    }
}
