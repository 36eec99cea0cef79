//! Driver registry for TMC variants.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories by variant name. Constructed at startup and passed by
//! reference; no global state.

use crate::error::AutotuneError;
use autotune_common::driver::{DriverError, TmcDriver};
use std::collections::HashMap;

/// Settings a driver is initialized with before tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverSettings {
    /// Microstep resolution code.
    pub mres: u8,
    /// External clock frequency (Hz), if any.
    pub clock_frequency: Option<f64>,
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn(&DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError>;

/// Registry of available driver variants.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in variant.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create and initialize a driver instance by name.
    ///
    /// # Errors
    /// Returns `AutotuneError::UnknownDriver` if no driver with the given
    /// name is registered, or the driver's initialization error.
    pub fn create_driver(
        &self,
        name: &str,
        settings: &DriverSettings,
    ) -> Result<Box<dyn TmcDriver>, AutotuneError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| AutotuneError::UnknownDriver(name.to_string()))?;
        Ok(factory(settings)?)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotune_common::consts::TRINAMIC_DRIVERS;

    const SETTINGS: DriverSettings = DriverSettings {
        mres: 4,
        clock_frequency: None,
    };

    #[test]
    fn registry_has_every_supported_variant() {
        let reg = DriverRegistry::with_builtin_drivers();
        let mut names = reg.list_drivers();
        names.sort();
        assert_eq!(names, TRINAMIC_DRIVERS.to_vec());
    }

    #[test]
    fn registry_creates_initialized_driver() {
        let reg = DriverRegistry::with_builtin_drivers();
        let driver = reg.create_driver("tmc2209", &SETTINGS).expect("should create");
        assert_eq!(driver.variant(), "tmc2209");
        assert_eq!(driver.get_field("mres"), Some(4));
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_driver("tmc9999", &SETTINGS);
        assert!(matches!(result, Err(AutotuneError::UnknownDriver(_))));
    }

    fn offline_driver(_settings: &DriverSettings) -> Result<Box<dyn TmcDriver>, DriverError> {
        Err(DriverError::Communication("offline".to_string()))
    }

    #[test]
    fn registry_propagates_init_failure() {
        let mut reg = DriverRegistry::new();
        reg.register("offline", offline_driver);
        let result = reg.create_driver("offline", &SETTINGS);
        assert!(matches!(result, Err(AutotuneError::Driver(DriverError::Communication(_)))));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", offline_driver);
        reg.register("dup", offline_driver);
    }
}
