//! TMC driver implementations.
//!
//! - [`simulation`] - Register-shadow driver used by the binary and tests
//! - [`table`] - Static register table types
//! - one module per supported variant with its register map
//!
//! # Adding New Variants
//!
//! 1. Create a new submodule with `NAME` and `REGISTERS`
//! 2. Add a factory below and register it in `register_all_drivers()`
//! 3. Add a driver section table to `AutotuneConfig`

pub mod simulation;
pub mod table;
pub mod tmc2130;
pub mod tmc2208;
pub mod tmc2209;
pub mod tmc2240;
pub mod tmc2660;
pub mod tmc5160;

use crate::driver_registry::{DriverRegistry, DriverSettings};
use autotune_common::driver::{DriverError, TmcDriver};
use simulation::SimulatedTmc;
use table::RegisterSpec;

/// Register every built-in variant.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(tmc2130::NAME, create_tmc2130);
    registry.register(tmc2208::NAME, create_tmc2208);
    registry.register(tmc2209::NAME, create_tmc2209);
    registry.register(tmc2240::NAME, create_tmc2240);
    registry.register(tmc2660::NAME, create_tmc2660);
    registry.register(tmc5160::NAME, create_tmc5160);
}

fn create(
    variant: &'static str,
    table: &'static [RegisterSpec],
    settings: &DriverSettings,
) -> Result<Box<dyn TmcDriver>, DriverError> {
    let mut driver = SimulatedTmc::new(variant, table, settings.clock_frequency);
    driver.init_registers(settings.mres)?;
    Ok(Box::new(driver))
}

fn create_tmc2130(settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
    create(tmc2130::NAME, tmc2130::REGISTERS, settings)
}

fn create_tmc2208(settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
    create(tmc2208::NAME, tmc2208::REGISTERS, settings)
}

fn create_tmc2209(settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
    create(tmc2209::NAME, tmc2209::REGISTERS, settings)
}

fn create_tmc2240(settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
    create(tmc2240::NAME, tmc2240::REGISTERS, settings)
}

fn create_tmc2660(settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
    create(tmc2660::NAME, tmc2660::REGISTERS, settings)
}

fn create_tmc5160(settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
    create(tmc5160::NAME, tmc5160::REGISTERS, settings)
}
