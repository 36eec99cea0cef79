//! Single-field register writes.
//!
//! `FieldWriter` applies named field values to a bound driver and records
//! them in a [`RegisterPlan`]. A field the variant does not have is skipped
//! and logged; it never fails the pass.

use crate::plan::{FieldValue, PlanEntry, RegisterPlan};
use crate::velocity::VelocityConverter;
use autotune_common::driver::{DriverError, TmcDriver};
use tracing::{debug, info};

/// Writes fields of one driver during one tuning pass.
pub struct FieldWriter<'a> {
    driver: &'a mut dyn TmcDriver,
    converter: VelocityConverter,
    plan: RegisterPlan,
}

impl<'a> FieldWriter<'a> {
    /// Start a pass on `driver` for `stepper`.
    pub fn new(stepper: &str, driver: &'a mut dyn TmcDriver, converter: VelocityConverter) -> Self {
        Self {
            driver,
            converter,
            plan: RegisterPlan::new(stepper),
        }
    }

    /// Encode `value` into `field` and write its register once.
    ///
    /// Returns `Ok(false)` when the variant has no such field.
    ///
    /// # Errors
    /// Propagates encode and transport errors from the driver.
    pub fn set_field(&mut self, field: &'static str, value: impl Into<FieldValue>) -> Result<bool, DriverError> {
        let value = value.into();
        let Some(descriptor) = self.driver.lookup_register(field) else {
            info!(
                "autotune_tmc {}: {} has no field {}, skipped",
                self.plan.stepper,
                self.driver.variant(),
                field
            );
            self.plan.skipped.push(field);
            return Ok(false);
        };

        let raw = self.driver.encode_field(field, value.raw())?;
        self.driver.write_register(&descriptor, raw)?;
        info!("autotune_tmc set {} {}={}", self.plan.stepper, field, value);
        self.plan.entries.push(PlanEntry { field, value });
        Ok(true)
    }

    /// Write `velocity` converted to a raw timestep.
    ///
    /// # Errors
    /// Propagates encode and transport errors from the driver.
    pub fn set_velocity_field(&mut self, field: &'static str, velocity: f64) -> Result<bool, DriverError> {
        let raw = self.converter.to_raw(velocity);
        debug!(
            "autotune_tmc {} {}: {:.3}/s -> tstep {} ({:.3}/s effective)",
            self.plan.stepper,
            field,
            velocity,
            raw,
            self.converter.to_velocity(raw)
        );
        self.set_field(field, FieldValue::Velocity { raw, velocity })
    }

    /// Write the largest value `field` can hold.
    ///
    /// # Errors
    /// Propagates encode and transport errors from the driver.
    pub fn set_field_max(&mut self, field: &'static str) -> Result<bool, DriverError> {
        let max = self
            .driver
            .lookup_register(field)
            .map(|descriptor| descriptor.max_value())
            .unwrap_or(0);
        self.set_field(field, max)
    }

    /// End the pass and hand out the plan.
    pub fn finish(self) -> RegisterPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedTmc;
    use crate::drivers::{tmc2208, tmc2240};

    fn converter() -> VelocityConverter {
        VelocityConverter::new(40.0 / 3200.0, 4, 12.5e6)
    }

    #[test]
    fn writes_present_field_once() {
        let mut drv = SimulatedTmc::new(tmc2240::NAME, tmc2240::REGISTERS, None);
        let mut writer = FieldWriter::new("stepper_z", &mut drv, converter());
        assert!(writer.set_field("toff", 3u8).unwrap());
        let plan = writer.finish();

        assert_eq!(plan.get("toff"), Some(FieldValue::Int(3)));
        assert_eq!(drv.writes().len(), 1);
        assert_eq!(drv.writes()[0].register, "CHOPCONF");
        assert_eq!(drv.get_field("toff"), Some(3));
    }

    #[test]
    fn missing_field_is_skipped_without_write() {
        let mut drv = SimulatedTmc::new(tmc2208::NAME, tmc2208::REGISTERS, None);
        let mut writer = FieldWriter::new("stepper_z", &mut drv, converter());
        assert!(!writer.set_field("thigh", 10u32).unwrap());
        let plan = writer.finish();

        assert!(plan.is_empty());
        assert_eq!(plan.skipped, vec!["thigh"]);
        assert!(drv.writes().is_empty());
    }

    #[test]
    fn velocity_field_is_converted() {
        let mut drv = SimulatedTmc::new(tmc2240::NAME, tmc2240::REGISTERS, None);
        let mut writer = FieldWriter::new("stepper_z", &mut drv, converter());
        writer.set_velocity_field("tcoolthrs", 32.0).unwrap();
        let plan = writer.finish();

        assert_eq!(plan.get("tcoolthrs"), Some(FieldValue::Velocity { raw: 305, velocity: 32.0 }));
        assert_eq!(drv.get_field("tcoolthrs"), Some(305));
    }

    #[test]
    fn field_max_uses_field_width() {
        let mut drv = SimulatedTmc::new(tmc2240::NAME, tmc2240::REGISTERS, None);
        let mut writer = FieldWriter::new("stepper_z", &mut drv, converter());
        writer.set_field_max("tpwmthrs").unwrap();
        writer.set_field_max("pwm_reg").unwrap();
        let plan = writer.finish();

        assert_eq!(plan.get("tpwmthrs"), Some(FieldValue::Int(0xfffff)));
        assert_eq!(plan.get("pwm_reg"), Some(FieldValue::Int(15)));
    }

    #[test]
    fn flag_fields_encode_as_bits() {
        let mut drv = SimulatedTmc::new(tmc2240::NAME, tmc2240::REGISTERS, None);
        let mut writer = FieldWriter::new("stepper_z", &mut drv, converter());
        writer.set_field("vhighfs", true).unwrap();
        writer.set_field("vhighchm", false).unwrap();
        writer.finish();

        assert_eq!(drv.get_field("vhighfs"), Some(1));
        assert_eq!(drv.get_field("vhighchm"), Some(0));
        assert_eq!(drv.register("CHOPCONF"), Some(1 << 18));
    }
}
