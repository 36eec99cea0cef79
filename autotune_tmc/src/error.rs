//! Autotuner error types.

use crate::command::CommandError;
use autotune_common::config::ConfigError;
use autotune_common::driver::DriverError;
use thiserror::Error;

/// Errors raised while constructing, wiring or running an autotuner.
#[derive(Debug, Clone, Error)]
pub enum AutotuneError {
    /// No `[stepper.<name>]` section for the tuned stepper.
    #[error("Could not find stepper config section '[stepper.{0}]' required by TMC autotuning")]
    StepperSectionMissing(String),

    /// None of the supported driver variants has a section for the stepper.
    #[error("Could not find any TMC driver config section for '{0}' required by TMC autotuning")]
    DriverSectionMissing(String),

    /// Motor profile is neither built in nor user-defined.
    #[error(
        "Could not find motor definition '[motor_constants.{0}]' required by TMC autotuning. \
         It is not part of the database, please define it in your config!"
    )]
    MotorNotFound(String),

    /// No driver factory for the variant.
    #[error("Driver not found: {0}")]
    UnknownDriver(String),

    /// Tuning requested before the driver was bound.
    #[error("Autotuner for '{0}' is not bound to a driver")]
    NotBound(String),

    /// Tuning requested before the driver reported ready.
    #[error("Autotuner for '{0}' is not active yet")]
    NotActivated(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Register access error.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Command parsing or validation error.
    #[error(transparent)]
    Command(#[from] CommandError),
}
