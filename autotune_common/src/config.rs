//! Configuration loading traits and types.
//!
//! The autotuner reads one TOML file at startup. Sections are keyed by
//! stepper name, mirroring the host's own layout:
//!
//! ```toml
//! [stepper.stepper_x]
//! rotation_distance = 40.0
//! microsteps = 16
//!
//! [tmc2209.stepper_x]
//! run_current = 1.2
//!
//! [autotune_tmc.stepper_x]
//! motor = "ldo-42sth48-2004ac"
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use autotune_common::config::{load_config, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = load_config(Path::new("autotune.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_FULL_STEPS_PER_ROTATION, DEFAULT_SPREADCYCLE_AXES, SERVICE_NAME, TRINAMIC_DRIVERS,
};
use crate::motor::MotorConstants;
use crate::tuning::TuningParameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// A section required by another section is absent.
    #[error("Missing configuration section: {0}")]
    MissingSection(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "autotune-printer-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    SERVICE_NAME.to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Kinematic description of one stepper (`[stepper.<name>]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepperSection {
    /// Distance travelled per full mechanical rotation (mm).
    pub rotation_distance: f64,

    /// Configured microsteps per full step. Power of two in `[1, 256]`.
    pub microsteps: u16,

    /// Full steps per mechanical rotation.
    #[serde(default = "default_full_steps")]
    pub full_steps_per_rotation: u32,
}

fn default_full_steps() -> u32 {
    DEFAULT_FULL_STEPS_PER_ROTATION
}

impl StepperSection {
    /// Distance travelled per microstep (mm).
    pub fn step_distance(&self) -> f64 {
        self.rotation_distance / (self.full_steps_per_rotation as f64 * self.microsteps as f64)
    }

    /// Microstep resolution code as stored in the driver's `mres` field
    /// (0 = 256 microsteps, 8 = full step).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `microsteps` is not a
    /// power of two in `[1, 256]`.
    pub fn mres(&self) -> Result<u8, ConfigError> {
        if !self.microsteps.is_power_of_two() || self.microsteps > 256 {
            return Err(ConfigError::ValidationError(format!(
                "microsteps must be a power of two between 1 and 256, got {}",
                self.microsteps
            )));
        }
        Ok(8 - self.microsteps.trailing_zeros() as u8)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.rotation_distance > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "[stepper.{name}] rotation_distance must be greater than 0"
            )));
        }
        if self.full_steps_per_rotation == 0 {
            return Err(ConfigError::ValidationError(format!(
                "[stepper.{name}] full_steps_per_rotation must be greater than 0"
            )));
        }
        self.mres()
            .map(|_| ())
            .map_err(|e| ConfigError::ValidationError(format!("[stepper.{name}] {e}")))
    }
}

/// Electrical settings of one driver (`[tmcXXXX.<name>]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverSection {
    /// Configured run current (A).
    pub run_current: f64,

    /// External clock frequency (Hz). `None` means the driver reports none.
    #[serde(default)]
    pub clock_frequency: Option<f64>,
}

impl DriverSection {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.run_current > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "driver section for {name}: run_current must be greater than 0"
            )));
        }
        if let Some(fclk) = self.clock_frequency {
            if !(fclk > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "driver section for {name}: clock_frequency must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

/// Autotuning knobs for one stepper (`[autotune_tmc.<name>]`).
///
/// Integer knobs are kept wide here so that out-of-range values reach
/// validation instead of failing deserialization with a type error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutotuneSection {
    /// Motor profile name, looked up in the motor database.
    pub motor: String,

    /// Use stealthchop. Defaults from the spreadcycle axis list.
    #[serde(default)]
    pub stealth: Option<bool>,

    /// Stealthchop at low speed, spreadcycle above the transition threshold.
    #[serde(default)]
    pub stealth_and_spread: bool,

    /// Extra hysteresis added to the computed value.
    #[serde(default)]
    pub extra_hysteresis: i64,

    /// Comparator blank time code.
    #[serde(default = "default_tbl")]
    pub tbl: i64,

    /// Spreadcycle off-time code, 0 for automatic.
    #[serde(default)]
    pub toff: i64,

    /// StallGuard2 threshold.
    #[serde(default = "default_sgt")]
    pub sgt: i64,

    /// StallGuard4 / legacy stall threshold.
    #[serde(default = "default_sg4_thrs")]
    pub sg4_thrs: i64,

    /// Motor supply voltage (V).
    #[serde(default = "default_voltage")]
    pub voltage: f64,

    /// Overvoltage comparator threshold (V).
    #[serde(default)]
    pub overvoltage_vth: Option<f64>,
}

fn default_tbl() -> i64 {
    2
}

fn default_sgt() -> i64 {
    1
}

fn default_sg4_thrs() -> i64 {
    10
}

fn default_voltage() -> f64 {
    24.0
}

fn default_spreadcycle_axes() -> Vec<String> {
    DEFAULT_SPREADCYCLE_AXES.iter().map(|s| s.to_string()).collect()
}

/// Complete autotuner configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutotuneConfig {
    /// Steppers that default to spreadcycle.
    #[serde(default = "default_spreadcycle_axes")]
    pub spreadcycle_axes: Vec<String>,

    /// Service-wide settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Stepper kinematics, keyed by stepper name.
    #[serde(default)]
    pub stepper: BTreeMap<String, StepperSection>,

    /// TMC2130 driver sections.
    #[serde(default)]
    pub tmc2130: BTreeMap<String, DriverSection>,
    /// TMC2208 driver sections.
    #[serde(default)]
    pub tmc2208: BTreeMap<String, DriverSection>,
    /// TMC2209 driver sections.
    #[serde(default)]
    pub tmc2209: BTreeMap<String, DriverSection>,
    /// TMC2240 driver sections.
    #[serde(default)]
    pub tmc2240: BTreeMap<String, DriverSection>,
    /// TMC2660 driver sections.
    #[serde(default)]
    pub tmc2660: BTreeMap<String, DriverSection>,
    /// TMC5160 driver sections.
    #[serde(default)]
    pub tmc5160: BTreeMap<String, DriverSection>,

    /// User-defined motor profiles, extending the built-in database.
    #[serde(default)]
    pub motor_constants: BTreeMap<String, MotorConstants>,

    /// Autotuning sections, keyed by stepper name.
    #[serde(default)]
    pub autotune_tmc: BTreeMap<String, AutotuneSection>,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            spreadcycle_axes: default_spreadcycle_axes(),
            shared: SharedConfig::default(),
            stepper: BTreeMap::new(),
            tmc2130: BTreeMap::new(),
            tmc2208: BTreeMap::new(),
            tmc2209: BTreeMap::new(),
            tmc2240: BTreeMap::new(),
            tmc2660: BTreeMap::new(),
            tmc5160: BTreeMap::new(),
            motor_constants: BTreeMap::new(),
            autotune_tmc: BTreeMap::new(),
        }
    }
}

impl AutotuneConfig {
    /// Find the driver section configured for `stepper`.
    ///
    /// Variants are searched in `TRINAMIC_DRIVERS` order; the first match wins.
    pub fn driver_section(&self, stepper: &str) -> Option<(&'static str, &DriverSection)> {
        TRINAMIC_DRIVERS.into_iter().find_map(|variant| {
            self.driver_sections(variant)?
                .get(stepper)
                .map(|section| (variant, section))
        })
    }

    /// All `[<variant>.<stepper>]` sections of one driver variant.
    pub fn driver_sections(&self, variant: &str) -> Option<&BTreeMap<String, DriverSection>> {
        match variant {
            "tmc2130" => Some(&self.tmc2130),
            "tmc2208" => Some(&self.tmc2208),
            "tmc2209" => Some(&self.tmc2209),
            "tmc2240" => Some(&self.tmc2240),
            "tmc2660" => Some(&self.tmc2660),
            "tmc5160" => Some(&self.tmc5160),
            _ => None,
        }
    }

    /// Whether `stepper` defaults to spreadcycle.
    pub fn is_spreadcycle_axis(&self, stepper: &str) -> bool {
        self.spreadcycle_axes.iter().any(|axis| axis == stepper)
    }

    /// Validate every section.
    ///
    /// Cross-section presence (stepper, driver, motor) is checked when the
    /// autotuner for a stepper is constructed, not here.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` on the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        for (name, section) in &self.stepper {
            section.validate(name)?;
        }

        for table in TRINAMIC_DRIVERS.into_iter().filter_map(|variant| self.driver_sections(variant)) {
            for (name, section) in table {
                section.validate(name)?;
            }
        }

        for (name, motor) in &self.motor_constants {
            motor
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("[motor_constants.{name}] {e}")))?;
        }

        for (name, section) in &self.autotune_tmc {
            TuningParameters::from_section(section, !self.is_spreadcycle_axis(name))
                .map_err(|e| ConfigError::ValidationError(format!("[autotune_tmc.{name}] {e}")))?;
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Load and validate an autotuner configuration file.
pub fn load_config(path: &Path) -> Result<AutotuneConfig, ConfigError> {
    let config = AutotuneConfig::load(path)?;
    config.validate()?;
    Ok(config)
}
