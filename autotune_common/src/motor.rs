//! Motor model trait and physical motor profile.
//!
//! The autotuner only depends on [`MotorModel`]. [`MotorConstants`] is the
//! profile shipped in the motor database, deriving chopper settings from a
//! motor's datasheet values.

use crate::consts::DEFAULT_CLOCK_FREQUENCY_HZ;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Chopper-relevant characteristics of one motor.
///
/// All functions are pure functions of their operating conditions.
pub trait MotorModel: Send + Sync {
    /// Spreadcycle hysteresis pair `(hstrt, hend)` in register units.
    fn hysteresis(&self, volts: f64, current: f64, tbl: u8, toff: u8, fclk: f64, extra: u8) -> (i64, i64);

    /// Rotations per second above which PWM current control runs out of voltage.
    fn max_pwm_rps(&self, volts: f64, current: f64) -> f64;

    /// Stealthchop PWM gradient initial value.
    fn pwm_gradient(&self, volts: f64, fclk: f64) -> i64;

    /// Stealthchop PWM offset initial value.
    fn pwm_offset(&self, volts: f64, current: f64) -> i64;
}

/// Datasheet values of a motor (`[motor_constants.<name>]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotorConstants {
    /// Phase resistance (Ω).
    pub resistance: f64,
    /// Phase inductance (H).
    pub inductance: f64,
    /// Holding torque (N·m).
    pub holding_torque: f64,
    /// Rated phase current (A).
    pub max_current: f64,
    /// Full steps per revolution.
    #[serde(default = "default_steps")]
    pub steps_per_revolution: u32,
}

fn default_steps() -> u32 {
    200
}

impl MotorConstants {
    /// Back-EMF constant (V·s/rad).
    pub fn back_emf(&self) -> f64 {
        self.holding_torque / (2.0 * self.max_current)
    }

    /// Check that every value is physically meaningful.
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("resistance", self.resistance),
            ("inductance", self.inductance),
            ("holding_torque", self.holding_torque),
            ("max_current", self.max_current),
        ];
        for (name, value) in values {
            if !(value > 0.0) {
                return Err(format!("{name} must be greater than 0"));
            }
        }
        if self.steps_per_revolution == 0 {
            return Err("steps_per_revolution must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl MotorModel for MotorConstants {
    fn hysteresis(&self, volts: f64, current: f64, tbl: u8, toff: u8, fclk: f64, extra: u8) -> (i64, i64) {
        let tblank = 16.0 * 1.5_f64.powi(tbl as i32) / fclk;
        let tsd = (12.0 + 32.0 * toff as f64) / fclk;
        let dcoilblank = volts * tblank / self.inductance;
        let dcoilsd = self.resistance * current * 2.0 * tsd / self.inductance;

        let base = (0.5 + ((dcoilblank + dcoilsd) * 2.0 * 248.0 * 32.0 / current) / 32.0 - 8.0)
            .max(-2.0)
            .ceil() as i64;
        let htotal = (extra as i64 + base).min(14);
        let hstrt = htotal.clamp(1, 8);
        let hend = (htotal - hstrt).min(12);

        (hstrt - 1, hend + 3)
    }

    fn max_pwm_rps(&self, volts: f64, current: f64) -> f64 {
        let grad = self.pwm_gradient(volts, DEFAULT_CLOCK_FREQUENCY_HZ).max(1);
        (255 - self.pwm_offset(volts, current)) as f64 / (PI * grad as f64)
    }

    fn pwm_gradient(&self, volts: f64, fclk: f64) -> i64 {
        (self.back_emf() * 2.0 * PI * fclk * 1.46 / (volts * 256.0 * self.steps_per_revolution as f64))
            .ceil() as i64
    }

    fn pwm_offset(&self, volts: f64, current: f64) -> i64 {
        (374.0 * self.resistance * current / volts).ceil() as i64
    }
}
