//! # TMC Autotune Library
//!
//! Derives Trinamic stepper driver register values from a motor profile,
//! the driver's feature set, a few tuning knobs and the live operating
//! point, and writes them through the driver's register interface.
//!
//! # Module Structure
//!
//! - [`capability`] - Driver capability classification
//! - [`velocity`] - Velocity to raw timestep conversion
//! - [`planner`] - Threshold and chopper planning
//! - [`field_writer`] - Single-field register writes
//! - [`orchestrator`] - Tuning pass and per-stepper lifecycle
//! - [`command`] - `AUTOTUNE_TMC` command parsing
//! - [`host`] - Section wiring and command routing
//! - [`plan`] - Register plan records
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Register-shadow drivers for the TMC family
//! - [`error`] - Autotuner error types
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  AutotuneHost ── AUTOTUNE_TMC ──► AutotuneTmc (per stepper)  │
//! │                                        │                     │
//! │                                        ▼                     │
//! │   classify ──► ThresholdPlanner ──► FieldWriter ──► TmcDriver│
//! │                     │                   │                    │
//! │                MotorModel       VelocityConverter            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod capability;
pub mod command;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod field_writer;
pub mod host;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod velocity;

// Re-export key types for convenience
pub use crate::capability::DriverCapabilities;
pub use crate::command::{AutotuneCommand, CommandError};
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::AutotuneError;
pub use crate::host::AutotuneHost;
pub use crate::orchestrator::{AutotuneTmc, StepperHandles, tune_driver};
pub use crate::plan::{FieldValue, RegisterPlan};
pub use crate::planner::{RuntimeContext, ThresholdPlan};
pub use crate::velocity::VelocityConverter;
