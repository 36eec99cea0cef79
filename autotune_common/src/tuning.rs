//! Tuning knobs and their declared bounds.
//!
//! `TuningParameters` is owned by the autotuner of one stepper and survives
//! across tuning passes. Both the config loader and the `AUTOTUNE_TMC`
//! command validate values against the same [`Bounds`] table.

use crate::config::AutotuneSection;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// A knob value fell outside its declared range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{knob}={value} is out of range [{min}, {max}]")]
pub struct RangeError {
    /// Knob name as written in config or command.
    pub knob: &'static str,
    /// Offending value.
    pub value: String,
    /// Lower bound (inclusive).
    pub min: String,
    /// Upper bound (inclusive).
    pub max: String,
}

/// Inclusive `[min, max]` range of a knob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    /// Knob name.
    pub knob: &'static str,
    /// Lower bound (inclusive).
    pub min: T,
    /// Upper bound (inclusive).
    pub max: T,
}

impl<T: PartialOrd + Copy + Display> Bounds<T> {
    /// Create a range for `knob`.
    pub const fn new(knob: &'static str, min: T, max: T) -> Self {
        Self { knob, min, max }
    }

    /// Whether `value` lies within both bounds.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// Return `value` unchanged if in range.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` if `value` is below `min` or above `max`.
    pub fn check(&self, value: T) -> Result<T, RangeError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(self.error(value))
        }
    }

    fn error(&self, value: T) -> RangeError {
        RangeError {
            knob: self.knob,
            value: value.to_string(),
            min: self.min.to_string(),
            max: self.max.to_string(),
        }
    }
}

impl Bounds<i64> {
    /// Check `value` and narrow it to the knob's storage type.
    pub fn narrow<U: TryFrom<i64>>(&self, value: i64) -> Result<U, RangeError> {
        let value = self.check(value)?;
        U::try_from(value).map_err(|_| self.error(value))
    }
}

/// `EXTRA_HYSTERESIS` bounds.
pub const EXTRA_HYSTERESIS: Bounds<i64> = Bounds::new("extra_hysteresis", 0, 8);
/// `TBL` bounds.
pub const TBL: Bounds<i64> = Bounds::new("tbl", 0, 3);
/// `TOFF` bounds; 0 selects the automatic off-time.
pub const TOFF: Bounds<i64> = Bounds::new("toff", 0, 15);
/// `SGT` bounds.
pub const SGT: Bounds<i64> = Bounds::new("sgt", -64, 63);
/// `SG4_THRS` bounds.
pub const SG4_THRS: Bounds<i64> = Bounds::new("sg4_thrs", 0, 255);
/// `VOLTAGE` bounds (V).
pub const VOLTAGE: Bounds<f64> = Bounds::new("voltage", 0.0, 60.0);
/// `OVERVOLTAGE_VTH` bounds (V).
pub const OVERVOLTAGE_VTH: Bounds<f64> = Bounds::new("overvoltage_vth", 0.0, 60.0);
/// `STEALTH` bounds.
pub const STEALTH: Bounds<i64> = Bounds::new("stealth", 0, 1);
/// `STEALTH_AND_SPREAD` bounds.
pub const STEALTH_AND_SPREAD: Bounds<i64> = Bounds::new("stealth_and_spread", 0, 1);

/// User tuning knobs of one stepper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningParameters {
    /// Extra hysteresis added to the motor model's value.
    pub extra_hysteresis: u8,
    /// Comparator blank time code.
    pub tbl: u8,
    /// Spreadcycle off-time code, 0 for automatic.
    pub toff: u8,
    /// StallGuard2 threshold.
    pub sgt: i8,
    /// StallGuard4 / legacy stall threshold.
    pub sg4_thrs: u8,
    /// Motor supply voltage (V).
    pub voltage: f64,
    /// Overvoltage comparator threshold (V).
    pub overvoltage_vth: Option<f64>,
    /// Stealthchop enabled.
    pub stealth: bool,
    /// Stealthchop below the transition threshold, spreadcycle above.
    pub stealth_and_spread: bool,
}

impl TuningParameters {
    /// Defaults for a stepper. `stealth` is the stealth default, normally
    /// false for the spreadcycle axes.
    pub fn with_stealth(stealth: bool) -> Self {
        Self {
            extra_hysteresis: 0,
            tbl: 2,
            toff: 0,
            sgt: 1,
            sg4_thrs: 10,
            voltage: 24.0,
            overvoltage_vth: None,
            stealth,
            stealth_and_spread: false,
        }
    }

    /// Build parameters from a config section.
    ///
    /// # Errors
    ///
    /// Returns `RangeError` for the first knob outside its bounds.
    pub fn from_section(section: &AutotuneSection, stealth_default: bool) -> Result<Self, RangeError> {
        let overvoltage_vth = match section.overvoltage_vth {
            Some(vth) => Some(OVERVOLTAGE_VTH.check(vth)?),
            None => None,
        };

        Ok(Self {
            extra_hysteresis: EXTRA_HYSTERESIS.narrow(section.extra_hysteresis)?,
            tbl: TBL.narrow(section.tbl)?,
            toff: TOFF.narrow(section.toff)?,
            sgt: SGT.narrow(section.sgt)?,
            sg4_thrs: SG4_THRS.narrow(section.sg4_thrs)?,
            voltage: VOLTAGE.check(section.voltage)?,
            overvoltage_vth,
            stealth: section.stealth.unwrap_or(stealth_default),
            stealth_and_spread: section.stealth_and_spread,
        })
    }
}
