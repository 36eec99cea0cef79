//! Motor profile database.
//!
//! A set of common motors ships with the crate; user-defined
//! `[motor_constants.*]` sections extend it and override built-in entries
//! of the same name.

use crate::config::ConfigError;
use crate::motor::{MotorConstants, MotorModel};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const BUILTIN_DATABASE: &str = include_str!("../data/motor_database.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseFile {
    #[serde(default)]
    motor_constants: BTreeMap<String, MotorConstants>,
}

/// Motor profiles keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MotorDatabase {
    motors: BTreeMap<String, Arc<MotorConstants>>,
}

impl MotorDatabase {
    /// Empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Database holding the built-in motor profiles.
    ///
    /// # Errors
    /// Returns `ConfigError::ParseError` if the embedded database is malformed.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml(BUILTIN_DATABASE)
            .map_err(|e| ConfigError::ParseError(format!("Cannot load motor database: {e}")))
    }

    /// Parse a database from TOML `[motor_constants.<name>]` tables.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: DatabaseFile =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut db = Self::new();
        db.extend(file.motor_constants)?;
        debug!("Motor database loaded with {} profiles", db.len());
        Ok(db)
    }

    /// Add or replace profiles.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` for the first invalid profile.
    pub fn extend<I>(&mut self, motors: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, MotorConstants)>,
    {
        for (name, motor) in motors {
            motor
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("motor {name}: {e}")))?;
            if self.motors.insert(name.clone(), Arc::new(motor)).is_some() {
                debug!("Motor profile {} overridden", name);
            }
        }
        Ok(())
    }

    /// Look up a profile by name.
    pub fn get(&self, name: &str) -> Option<Arc<MotorConstants>> {
        self.motors.get(name).cloned()
    }

    /// Look up a profile by name as a motor model.
    pub fn model(&self, name: &str) -> Option<Arc<dyn MotorModel>> {
        self.get(name).map(|m| m as Arc<dyn MotorModel>)
    }

    /// Profile names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(String::as_str)
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.motors.len()
    }

    /// Whether the database is empty.
    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }
}
