//! Prelude module for common re-exports.
//!
//! ```rust
//! use autotune_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AutotuneConfig, AutotuneSection, ConfigError, ConfigLoader, DriverSection, LogLevel,
    SharedConfig, StepperSection, load_config,
};

// ─── Driver & host interfaces ───────────────────────────────────────
pub use crate::driver::{DriverError, FieldDescriptor, TmcDriver};
pub use crate::stepper::{ConfiguredCurrent, CurrentControl, StepperKinematics};

// ─── Motor model ────────────────────────────────────────────────────
pub use crate::motor::{MotorConstants, MotorModel};
pub use crate::motor_db::MotorDatabase;

// ─── Tuning ─────────────────────────────────────────────────────────
pub use crate::tuning::{RangeError, TuningParameters};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CLOCK_FREQUENCY_HZ, MAX_TSTEP, TRINAMIC_DRIVERS};
