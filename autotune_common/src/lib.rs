//! Autotune Common Library
//!
//! Shared types for the TMC autotuning workspace: configuration loading,
//! tuning knob bounds, the driver register interface, host collaborator
//! traits and the motor model.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration sections and loading
//! - [`consts`] - Driver-family constants and defaults
//! - [`driver`] - `TmcDriver` register interface and `DriverError`
//! - [`stepper`] - Run-current and kinematics collaborator traits
//! - [`motor`] - `MotorModel` trait and `MotorConstants` profile
//! - [`motor_db`] - Built-in and user-defined motor database
//! - [`tuning`] - Tuning knobs, their bounds and defaults
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod driver;
pub mod motor;
pub mod motor_db;
pub mod prelude;
pub mod stepper;
pub mod tuning;
