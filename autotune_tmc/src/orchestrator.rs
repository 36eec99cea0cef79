//! Tuning orchestrator.
//!
//! [`tune_driver`] runs one complete tuning pass against a driver.
//! [`AutotuneTmc`] wraps it with the per-stepper state that survives
//! between passes and with the two-phase lifecycle:
//!
//! 1. [`AutotuneTmc::bind`] captures the driver and host collaborators once
//!    they exist. No computation happens here.
//! 2. [`AutotuneTmc::activate`] records the driver clock and runs the first
//!    pass. Later passes come from [`AutotuneTmc::apply_command`].

use crate::capability::{
    self, LEGACY_THRESHOLD_FIELD, OVERVOLTAGE_FIELD, SG4_FILTER_FIELD, SG4_THRESHOLD_FIELD,
};
use crate::command::AutotuneCommand;
use crate::error::AutotuneError;
use crate::field_writer::FieldWriter;
use crate::plan::RegisterPlan;
use crate::planner::{RuntimeContext, StallThreshold, ThresholdPlanner};
use crate::velocity::VelocityConverter;
use autotune_common::config::{AutotuneConfig, ConfigError, DriverSection, StepperSection};
use autotune_common::consts::DEFAULT_CLOCK_FREQUENCY_HZ;
use autotune_common::driver::{DriverError, TmcDriver};
use autotune_common::motor::MotorModel;
use autotune_common::motor_db::MotorDatabase;
use autotune_common::stepper::{CurrentControl, StepperKinematics};
use autotune_common::tuning::TuningParameters;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Write every tuned field of `driver` and return what was written.
///
/// # Errors
/// Propagates driver encode and transport failures. Fields the variant
/// lacks are skipped, not errors.
pub fn tune_driver(
    stepper: &str,
    driver: &mut dyn TmcDriver,
    motor: &dyn MotorModel,
    params: &TuningParameters,
    ctx: &RuntimeContext,
) -> Result<RegisterPlan, DriverError> {
    let capabilities = capability::classify(driver);
    debug!("autotune_tmc {} capabilities {:?}", stepper, capabilities);
    let plan = ThresholdPlanner::new(motor, capabilities).plan(params, ctx);

    let converter = VelocityConverter::new(ctx.step_distance, ctx.mres, ctx.clock_frequency);
    let mut writer = FieldWriter::new(stepper, driver, converter);

    writer.set_field("hstrt", plan.hstrt)?;
    writer.set_field("hend", plan.hend)?;
    writer.set_field("pwm_freq", plan.pwm_freq)?;

    match plan.stall_threshold {
        StallThreshold::Sg4(threshold) => {
            writer.set_field(SG4_THRESHOLD_FIELD, threshold)?;
            writer.set_field(SG4_FILTER_FIELD, true)?;
        }
        StallThreshold::Legacy(threshold) => {
            writer.set_field(LEGACY_THRESHOLD_FIELD, threshold)?;
        }
        StallThreshold::Unsupported => {}
    }

    info!("autotune_tmc using max PWM speed {:.6}", plan.vmaxpwm);
    if let Some(vth) = plan.overvoltage_vth {
        writer.set_field(OVERVOLTAGE_FIELD, vth)?;
    }

    // Autoscale runs even in spreadcycle: CoolStep needs its measurements.
    writer.set_field("pwm_autoscale", true)?;
    writer.set_field("pwm_autograd", true)?;
    writer.set_field("pwm_grad", plan.pwm_grad)?;
    writer.set_field("pwm_ofs", plan.pwm_ofs)?;
    writer.set_field("pwm_reg", 15u8)?;
    writer.set_field("pwm_lim", 4u8)?;
    writer.set_field("en_pwm_mode", params.stealth || params.stealth_and_spread)?;
    if params.stealth_and_spread {
        writer.set_velocity_field("tpwmthrs", plan.pwmthrs)?;
    } else if params.stealth {
        writer.set_field("tpwmthrs", 0u32)?;
    } else {
        writer.set_field_max("tpwmthrs")?;
    }

    writer.set_field("tpfd", 3u8)?;
    writer.set_field("tbl", params.tbl)?;
    writer.set_field("toff", plan.toff)?;

    writer.set_velocity_field("tcoolthrs", plan.coolthrs)?;
    writer.set_field("sgt", params.sgt)?;
    writer.set_field("fast_standstill", true)?;
    writer.set_field("small_hysteresis", false)?;
    writer.set_field("semin", 8u8)?;
    writer.set_field("semax", 4u8)?;
    writer.set_field("seup", 3u8)?;
    writer.set_field("sedn", 0u8)?;
    // Dropping to 1/4 current breaks high accelerations.
    writer.set_field("seimin", 0u8)?;
    writer.set_field("sfilt", 0u8)?;
    writer.set_field("iholddelay", 12u8)?;
    writer.set_field("irundelay", 0u8)?;

    writer.set_velocity_field("thigh", plan.vhigh)?;
    writer.set_field("vhighfs", true)?;
    // Keep spreadcycle control while fullstepping.
    writer.set_field("vhighchm", false)?;

    writer.set_field("multistep_filt", true)?;

    Ok(writer.finish())
}

/// Driver and host collaborators of one stepper, handed over at bind time.
pub struct StepperHandles {
    /// Register access.
    pub driver: Box<dyn TmcDriver>,
    /// Live run current.
    pub current: Box<dyn CurrentControl>,
    /// Rotation and step distance.
    pub kinematics: Box<dyn StepperKinematics>,
}

/// Autotuner of one stepper.
pub struct AutotuneTmc {
    name: String,
    driver_variant: &'static str,
    driver_section: DriverSection,
    stepper_section: StepperSection,
    motor_name: String,
    motor: Arc<dyn MotorModel>,
    params: TuningParameters,
    handles: Option<StepperHandles>,
    clock_frequency: Option<f64>,
}

impl AutotuneTmc {
    /// Build the autotuner for `stepper` from its config sections.
    ///
    /// # Errors
    /// - `StepperSectionMissing` if there is no `[stepper.<name>]`
    /// - `DriverSectionMissing` if no supported driver section names it
    /// - `MotorNotFound` if the motor profile is unknown
    /// - `Config` if the `[autotune_tmc.<name>]` section is absent or invalid
    pub fn new(stepper: &str, config: &AutotuneConfig, motors: &MotorDatabase) -> Result<Self, AutotuneError> {
        let section = config
            .autotune_tmc
            .get(stepper)
            .ok_or_else(|| ConfigError::MissingSection(format!("autotune_tmc.{stepper}")))?;
        let stepper_section = config
            .stepper
            .get(stepper)
            .ok_or_else(|| AutotuneError::StepperSectionMissing(stepper.to_string()))?;
        let (driver_variant, driver_section) = config
            .driver_section(stepper)
            .ok_or_else(|| AutotuneError::DriverSectionMissing(stepper.to_string()))?;
        let motor = motors
            .model(&section.motor)
            .ok_or_else(|| AutotuneError::MotorNotFound(section.motor.clone()))?;

        let params = TuningParameters::from_section(section, !config.is_spreadcycle_axis(stepper))
            .map_err(|e| ConfigError::ValidationError(format!("[autotune_tmc.{stepper}] {e}")))?;

        debug!(
            "autotune_tmc {} configured: driver={} motor={} stealth={}",
            stepper, driver_variant, section.motor, params.stealth
        );

        Ok(Self {
            name: stepper.to_string(),
            driver_variant,
            driver_section: driver_section.clone(),
            stepper_section: stepper_section.clone(),
            motor_name: section.motor.clone(),
            motor,
            params,
            handles: None,
            clock_frequency: None,
        })
    }

    /// Capture the driver and host collaborators. Rebinding replaces them
    /// and requires a new activation.
    pub fn bind(&mut self, handles: StepperHandles) {
        let variant = handles.driver.variant();
        if variant != self.driver_variant {
            warn!(
                "autotune_tmc {}: bound driver is {} but config names {}",
                self.name, variant, self.driver_variant
            );
        }
        debug!("autotune_tmc {} bound to {}", self.name, variant);
        self.handles = Some(handles);
        self.clock_frequency = None;
    }

    /// Record the driver clock and run the first tuning pass.
    ///
    /// An unknown or non-positive clock falls back to 12.5 MHz.
    ///
    /// # Errors
    /// `NotBound` before [`bind`](Self::bind); otherwise as [`tune`](Self::tune).
    pub fn activate(&mut self, clock_frequency: Option<f64>) -> Result<RegisterPlan, AutotuneError> {
        if self.handles.is_none() {
            return Err(AutotuneError::NotBound(self.name.clone()));
        }
        let fclk = clock_frequency
            .filter(|fclk| *fclk > 0.0)
            .unwrap_or(DEFAULT_CLOCK_FREQUENCY_HZ);
        info!("autotune_tmc {} active, motor={} fclk={}", self.name, self.motor_name, fclk);
        self.clock_frequency = Some(fclk);
        self.tune()
    }

    /// Activate with the clock the bound driver reports.
    ///
    /// # Errors
    /// As [`activate`](Self::activate).
    pub fn on_driver_ready(&mut self) -> Result<RegisterPlan, AutotuneError> {
        let reported = self
            .handles
            .as_ref()
            .ok_or_else(|| AutotuneError::NotBound(self.name.clone()))?
            .driver
            .clock_frequency();
        self.activate(reported)
    }

    /// Run one tuning pass with the stored parameters.
    ///
    /// # Errors
    /// `NotBound`/`NotActivated` on lifecycle misuse, `Driver` when the
    /// driver rejects a write or lacks its `mres` field.
    pub fn tune(&mut self) -> Result<RegisterPlan, AutotuneError> {
        let ctx = self.runtime_context()?;
        let handles = self
            .handles
            .as_mut()
            .ok_or_else(|| AutotuneError::NotBound(self.name.clone()))?;
        let plan = tune_driver(&self.name, handles.driver.as_mut(), self.motor.as_ref(), &self.params, &ctx)?;
        Ok(plan)
    }

    /// Apply a validated `AUTOTUNE_TMC` command and re-tune.
    ///
    /// # Errors
    /// Lifecycle errors leave the parameters untouched; otherwise as
    /// [`tune`](Self::tune).
    pub fn apply_command(&mut self, command: &AutotuneCommand) -> Result<RegisterPlan, AutotuneError> {
        self.ensure_active()?;
        info!("AUTOTUNE_TMC {}", self.name);
        command.apply_to(&mut self.params);
        self.tune()
    }

    /// Operating point read fresh from the collaborators.
    ///
    /// # Errors
    /// Lifecycle errors, or `Driver` if `mres` cannot be read.
    pub fn runtime_context(&self) -> Result<RuntimeContext, AutotuneError> {
        self.ensure_active()?;
        let handles = self
            .handles
            .as_ref()
            .ok_or_else(|| AutotuneError::NotBound(self.name.clone()))?;
        let clock_frequency = self
            .clock_frequency
            .ok_or_else(|| AutotuneError::NotActivated(self.name.clone()))?;
        let mres = handles
            .driver
            .get_field("mres")
            .and_then(|mres| u8::try_from(mres).ok())
            .ok_or_else(|| DriverError::FieldNotFound("mres".to_string()))?;

        Ok(RuntimeContext {
            run_current: handles.current.run_current(),
            rotation_distance: handles.kinematics.rotation_distance(),
            step_distance: handles.kinematics.step_distance(),
            mres,
            clock_frequency,
        })
    }

    fn ensure_active(&self) -> Result<(), AutotuneError> {
        if self.handles.is_none() {
            return Err(AutotuneError::NotBound(self.name.clone()));
        }
        if self.clock_frequency.is_none() {
            return Err(AutotuneError::NotActivated(self.name.clone()));
        }
        Ok(())
    }

    /// Stepper name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Driver variant named in config.
    pub fn driver_variant(&self) -> &'static str {
        self.driver_variant
    }

    /// Driver config section.
    pub fn driver_section(&self) -> &DriverSection {
        &self.driver_section
    }

    /// Stepper config section.
    pub fn stepper_section(&self) -> &StepperSection {
        &self.stepper_section
    }

    /// Stored tuning parameters.
    pub fn parameters(&self) -> &TuningParameters {
        &self.params
    }

    /// Whether a driver is bound.
    pub fn is_bound(&self) -> bool {
        self.handles.is_some()
    }

    /// Whether the first pass has run.
    pub fn is_active(&self) -> bool {
        self.handles.is_some() && self.clock_frequency.is_some()
    }

    /// Clock frequency recorded at activation.
    pub fn clock_frequency(&self) -> Option<f64> {
        self.clock_frequency
    }

    /// Bound driver.
    pub fn driver(&self) -> Option<&dyn TmcDriver> {
        self.handles.as_ref().map(|handles| handles.driver.as_ref())
    }

    /// Bound collaborators, for swapping the current source or kinematics.
    pub fn handles_mut(&mut self) -> Option<&mut StepperHandles> {
        self.handles.as_mut()
    }
}
