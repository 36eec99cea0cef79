//! Velocity to raw timestep conversion.
//!
//! Velocity-gated registers (`tcoolthrs`, `tpwmthrs`, `thigh`) compare
//! against TSTEP, the number of driver clock cycles between two 1/256
//! microsteps. Faster motion means a smaller TSTEP.

use autotune_common::consts::MAX_TSTEP;

/// Convert `velocity` (distance/s) into a raw TSTEP threshold.
///
/// Non-positive velocities map to [`MAX_TSTEP`]; results clamp into
/// `[0, MAX_TSTEP]`.
pub fn to_raw_timestep(step_distance: f64, mres: u8, clock_frequency: f64, velocity: f64) -> u32 {
    if !(velocity > 0.0) {
        return MAX_TSTEP;
    }
    let threshold = (clock_frequency * step_distance_256(step_distance, mres) / velocity + 0.5).floor();
    threshold.clamp(0.0, MAX_TSTEP as f64) as u32
}

/// Velocity (distance/s) at which TSTEP equals `raw`.
pub fn from_raw_timestep(step_distance: f64, mres: u8, clock_frequency: f64, raw: u32) -> f64 {
    if raw == 0 {
        return f64::INFINITY;
    }
    clock_frequency * step_distance_256(step_distance, mres) / raw as f64
}

fn step_distance_256(step_distance: f64, mres: u8) -> f64 {
    step_distance / 2f64.powi(mres as i32)
}

/// Conversion bound to one stepper's operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityConverter {
    /// Distance per microstep.
    pub step_distance: f64,
    /// Microstep resolution code.
    pub mres: u8,
    /// Driver clock frequency (Hz).
    pub clock_frequency: f64,
}

impl VelocityConverter {
    /// Bind the conversion parameters.
    pub fn new(step_distance: f64, mres: u8, clock_frequency: f64) -> Self {
        Self {
            step_distance,
            mres,
            clock_frequency,
        }
    }

    /// Raw TSTEP for `velocity`.
    pub fn to_raw(&self, velocity: f64) -> u32 {
        to_raw_timestep(self.step_distance, self.mres, self.clock_frequency, velocity)
    }

    /// Velocity for a raw TSTEP.
    pub fn to_velocity(&self, raw: u32) -> f64 {
        from_raw_timestep(self.step_distance, self.mres, self.clock_frequency, raw)
    }
}
