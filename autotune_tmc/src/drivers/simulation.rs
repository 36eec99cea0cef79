//! Register-shadow driver.
//!
//! `SimulatedTmc` implements [`TmcDriver`] over a static register table,
//! keeping an in-memory copy of every register and a log of each write
//! issued. It stands in for the chip transport so the whole engine can run
//! without hardware.

use super::table::{FieldIndex, RegisterSpec};
use autotune_common::driver::{DriverError, FieldDescriptor, TmcDriver};
use std::collections::BTreeMap;
use tracing::debug;

/// One register write as it would be sent to the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Register name.
    pub register: &'static str,
    /// Register address.
    pub address: u8,
    /// Complete register value.
    pub value: u32,
}

/// In-memory driver for one variant.
#[derive(Debug, Clone)]
pub struct SimulatedTmc {
    variant: &'static str,
    fields: FieldIndex,
    registers: BTreeMap<&'static str, u32>,
    writes: Vec<RegisterWrite>,
    clock_frequency: Option<f64>,
}

impl SimulatedTmc {
    /// Create a driver with all registers zeroed.
    pub fn new(variant: &'static str, table: &'static [RegisterSpec], clock_frequency: Option<f64>) -> Self {
        Self {
            variant,
            fields: FieldIndex::new(table),
            registers: table.iter().map(|reg| (reg.name, 0)).collect(),
            writes: Vec::new(),
            clock_frequency,
        }
    }

    /// Store the microstep resolution, as the driver's own register
    /// initialization would.
    pub fn init_registers(&mut self, mres: u8) -> Result<(), DriverError> {
        let descriptor = self
            .fields
            .get("mres")
            .ok_or_else(|| DriverError::FieldNotFound("mres".to_string()))?;
        let raw = self.encode_field("mres", mres as i64)?;
        self.write_register(&descriptor, raw)?;
        debug!("{} initialized with mres={}", self.variant, mres);
        Ok(())
    }

    /// Shadow value of a register.
    pub fn register(&self, name: &str) -> Option<u32> {
        self.registers.get(name).copied()
    }

    /// Every write issued so far, oldest first.
    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Drain the write log.
    pub fn take_writes(&mut self) -> Vec<RegisterWrite> {
        std::mem::take(&mut self.writes)
    }
}

impl TmcDriver for SimulatedTmc {
    fn variant(&self) -> &'static str {
        self.variant
    }

    fn lookup_register(&self, field: &str) -> Option<FieldDescriptor> {
        self.fields.get(field)
    }

    fn encode_field(&mut self, field: &str, value: i64) -> Result<u32, DriverError> {
        let descriptor = self
            .fields
            .get(field)
            .ok_or_else(|| DriverError::FieldNotFound(field.to_string()))?;
        let current = self.registers.get(descriptor.register).copied().unwrap_or(0);
        let encoded = descriptor.encode(current, value);
        self.registers.insert(descriptor.register, encoded);
        Ok(encoded)
    }

    fn write_register(&mut self, descriptor: &FieldDescriptor, raw: u32) -> Result<(), DriverError> {
        if !self.registers.contains_key(descriptor.register) {
            return Err(DriverError::RegisterNotFound(descriptor.register.to_string()));
        }
        self.writes.push(RegisterWrite {
            register: descriptor.register,
            address: descriptor.address,
            value: raw,
        });
        Ok(())
    }

    fn get_field(&self, field: &str) -> Option<i64> {
        let descriptor = self.fields.get(field)?;
        let value = self.registers.get(descriptor.register).copied().unwrap_or(0);
        Some(descriptor.decode(value))
    }

    fn clock_frequency(&self) -> Option<f64> {
        self.clock_frequency
    }
}
