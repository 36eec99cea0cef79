//! Autotuning host.
//!
//! The `AutotuneHost` owns one [`AutotuneTmc`] per `[autotune_tmc.<name>]`
//! section. It drives the two lifecycle phases for every stepper and
//! routes `AUTOTUNE_TMC` commands by their `STEPPER` parameter.

use crate::command::{AutotuneCommand, CommandError};
use crate::driver_registry::{DriverRegistry, DriverSettings};
use crate::error::AutotuneError;
use crate::orchestrator::{AutotuneTmc, StepperHandles};
use crate::plan::RegisterPlan;
use autotune_common::config::{AutotuneConfig, ConfigError};
use autotune_common::motor_db::MotorDatabase;
use autotune_common::stepper::ConfiguredCurrent;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Built-in motor profiles extended by the config's `[motor_constants.*]`.
///
/// # Errors
/// Returns `ConfigError` if the built-in database or a user profile is invalid.
pub fn load_motor_database(config: &AutotuneConfig) -> Result<MotorDatabase, ConfigError> {
    let mut motors = MotorDatabase::builtin()?;
    motors.extend(config.motor_constants.clone())?;
    info!(
        "Motor database: {} profiles ({} user-defined)",
        motors.len(),
        config.motor_constants.len()
    );
    Ok(motors)
}

/// Autotuners of every configured stepper.
pub struct AutotuneHost {
    tuners: BTreeMap<String, AutotuneTmc>,
}

impl AutotuneHost {
    /// Build every autotuner, loading the motor database from `config`.
    ///
    /// # Errors
    /// The first construction failure; see [`AutotuneTmc::new`].
    pub fn new(config: &AutotuneConfig) -> Result<Self, AutotuneError> {
        let motors = load_motor_database(config)?;
        Self::from_config(config, &motors)
    }

    /// Build every autotuner against an existing motor database.
    ///
    /// # Errors
    /// The first construction failure; see [`AutotuneTmc::new`].
    pub fn from_config(config: &AutotuneConfig, motors: &MotorDatabase) -> Result<Self, AutotuneError> {
        let tuners = config
            .autotune_tmc
            .keys()
            .map(|name| Ok((name.clone(), AutotuneTmc::new(name, config, motors)?)))
            .collect::<Result<BTreeMap<_, _>, AutotuneError>>()?;
        info!("AutotuneHost created with {} steppers", tuners.len());
        Ok(Self { tuners })
    }

    /// Create and bind a driver for every stepper.
    ///
    /// # Errors
    /// `UnknownDriver` if the registry lacks a variant, `Config` for an
    /// invalid microstep setting, `Driver` if initialization fails.
    pub fn connect(&mut self, registry: &DriverRegistry) -> Result<(), AutotuneError> {
        for tuner in self.tuners.values_mut() {
            let settings = DriverSettings {
                mres: tuner.stepper_section().mres()?,
                clock_frequency: tuner.driver_section().clock_frequency,
            };
            let driver = registry.create_driver(tuner.driver_variant(), &settings)?;
            let handles = StepperHandles {
                driver,
                current: Box::new(ConfiguredCurrent::from(tuner.driver_section())),
                kinematics: Box::new(tuner.stepper_section().clone()),
            };
            tuner.bind(handles);
        }
        debug!("AutotuneHost connected {} drivers", self.tuners.len());
        Ok(())
    }

    /// Activate every stepper and return the first plans, in stepper order.
    ///
    /// # Errors
    /// The first activation failure.
    pub fn ready(&mut self) -> Result<Vec<RegisterPlan>, AutotuneError> {
        self.tuners.values_mut().map(AutotuneTmc::on_driver_ready).collect()
    }

    /// Run one `AUTOTUNE_TMC` command line.
    ///
    /// # Errors
    /// `Command` for parse, validation or unknown-stepper errors; otherwise
    /// as [`AutotuneTmc::apply_command`].
    pub fn dispatch(&mut self, line: &str) -> Result<RegisterPlan, AutotuneError> {
        let command = AutotuneCommand::parse(line)?;
        let tuner = self
            .tuners
            .get_mut(&command.stepper)
            .ok_or_else(|| CommandError::UnknownStepper(command.stepper.clone()))?;
        if command.is_retune_only() {
            debug!("AUTOTUNE_TMC {} without changes, re-tuning", command.stepper);
        }
        tuner.apply_command(&command)
    }

    /// Autotuner of `stepper`.
    pub fn tuner(&self, stepper: &str) -> Option<&AutotuneTmc> {
        self.tuners.get(stepper)
    }

    /// Tuned stepper names, sorted.
    pub fn steppers(&self) -> impl Iterator<Item = &str> {
        self.tuners.keys().map(String::as_str)
    }

    /// Number of tuned steppers.
    pub fn len(&self) -> usize {
        self.tuners.len()
    }

    /// Whether no stepper is tuned.
    pub fn is_empty(&self) -> bool {
        self.tuners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [stepper.stepper_x]
        rotation_distance = 40.0
        microsteps = 16

        [stepper.stepper_z]
        rotation_distance = 8.0
        microsteps = 32

        [tmc2209.stepper_x]
        run_current = 1.0

        [tmc2240.stepper_z]
        run_current = 1.2
        clock_frequency = 10.0e6

        [autotune_tmc.stepper_x]
        motor = "ldo-42sth48-2004ac"

        [autotune_tmc.stepper_z]
        motor = "omc-17hs19-2004s1"
    "#;

    fn host() -> AutotuneHost {
        let config: AutotuneConfig = toml::from_str(CONFIG).unwrap();
        let mut host = AutotuneHost::new(&config).unwrap();
        host.connect(&DriverRegistry::with_builtin_drivers()).unwrap();
        host
    }

    #[test]
    fn ready_tunes_every_stepper() {
        let mut host = host();
        let plans = host.ready().unwrap();
        let names: Vec<_> = plans.iter().map(|p| p.stepper.as_str()).collect();
        assert_eq!(names, vec!["stepper_x", "stepper_z"]);
        assert_eq!(host.tuner("stepper_z").unwrap().clock_frequency(), Some(10.0e6));
        assert_eq!(host.tuner("stepper_x").unwrap().clock_frequency(), Some(12.5e6));
    }

    #[test]
    fn spreadcycle_axis_defaults() {
        let host = host();
        assert!(!host.tuner("stepper_x").unwrap().parameters().stealth);
        assert!(host.tuner("stepper_z").unwrap().parameters().stealth);
    }

    #[test]
    fn dispatch_routes_by_stepper() {
        let mut host = host();
        host.ready().unwrap();
        let plan = host.dispatch("AUTOTUNE_TMC STEPPER=stepper_z SGT=-3").unwrap();
        assert_eq!(plan.stepper, "stepper_z");
        assert_eq!(host.tuner("stepper_z").unwrap().parameters().sgt, -3);
        assert_eq!(host.tuner("stepper_x").unwrap().parameters().sgt, 1);
    }

    #[test]
    fn dispatch_rejects_unknown_stepper() {
        let mut host = host();
        host.ready().unwrap();
        assert!(matches!(
            host.dispatch("AUTOTUNE_TMC STEPPER=stepper_e"),
            Err(AutotuneError::Command(CommandError::UnknownStepper(_)))
        ));
    }

    #[test]
    fn rejected_command_leaves_parameters() {
        let mut host = host();
        host.ready().unwrap();
        let before = host.tuner("stepper_z").unwrap().parameters().clone();
        assert!(host.dispatch("AUTOTUNE_TMC STEPPER=stepper_z TBL=1 TOFF=16").is_err());
        assert_eq!(host.tuner("stepper_z").unwrap().parameters(), &before);
    }

    #[test]
    fn missing_registry_variant_fails_connect() {
        let config: AutotuneConfig = toml::from_str(CONFIG).unwrap();
        let mut host = AutotuneHost::new(&config).unwrap();
        let result = host.connect(&DriverRegistry::new());
        assert!(matches!(result, Err(AutotuneError::UnknownDriver(_))));
    }
}
