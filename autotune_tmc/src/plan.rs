//! Register plan: the ordered record of one tuning pass.

use serde::Serialize;
use std::fmt;

/// Value written to one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Single-bit flag.
    Flag(bool),
    /// Plain integer.
    Int(i64),
    /// Velocity threshold converted to TSTEP.
    Velocity {
        /// Raw TSTEP written.
        raw: u32,
        /// Source velocity (distance/s).
        velocity: f64,
    },
}

impl FieldValue {
    /// Integer written to the field.
    pub fn raw(&self) -> i64 {
        match *self {
            FieldValue::Flag(flag) => flag as i64,
            FieldValue::Int(value) => value,
            FieldValue::Velocity { raw, .. } => raw as i64,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Flag(flag)
    }
}

macro_rules! int_field_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::Int(value as i64)
            }
        })*
    };
}

int_field_value!(u8, i8, u32, i64);

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(flag) => write!(f, "{}", if *flag { "True" } else { "False" }),
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Velocity { raw, velocity } => write!(f, "{raw}({velocity:.6})"),
        }
    }
}

/// One applied field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    /// Field name.
    pub field: &'static str,
    /// Value written.
    pub value: FieldValue,
}

/// Every field write of one tuning pass, in write order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterPlan {
    /// Tuned stepper.
    pub stepper: String,
    /// Applied fields.
    pub entries: Vec<PlanEntry>,
    /// Fields the driver variant does not have.
    pub skipped: Vec<&'static str>,
}

impl RegisterPlan {
    /// Empty plan for `stepper`.
    pub fn new(stepper: impl Into<String>) -> Self {
        Self {
            stepper: stepper.into(),
            entries: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Value of the last write to `field`.
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.field == field)
            .map(|entry| entry.value)
    }

    /// Whether `field` was written.
    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|entry| entry.field == field)
    }

    /// Written field names, in order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.field)
    }

    /// Number of fields written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for RegisterPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.stepper)?;
        for entry in &self.entries {
            writeln!(f, "{}={}", entry.field, entry.value)?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "# not present on driver: {}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_one_line_per_field() {
        let mut plan = RegisterPlan::new("stepper_z");
        plan.entries.push(PlanEntry { field: "toff", value: 3u8.into() });
        plan.entries.push(PlanEntry { field: "vhighfs", value: true.into() });
        plan.skipped.push("thigh");
        assert_eq!(
            plan.to_string(),
            "[stepper_z]\ntoff=3\nvhighfs=True\n# not present on driver: thigh\n"
        );
    }

    #[test]
    fn get_returns_last_write() {
        let mut plan = RegisterPlan::new("stepper_z");
        plan.entries.push(PlanEntry { field: "tpwmthrs", value: 0u32.into() });
        plan.entries.push(PlanEntry { field: "tpwmthrs", value: 7u32.into() });
        assert_eq!(plan.get("tpwmthrs"), Some(FieldValue::Int(7)));
        assert!(plan.get("thigh").is_none());
    }

    #[test]
    fn raw_of_each_kind() {
        assert_eq!(FieldValue::Flag(true).raw(), 1);
        assert_eq!(FieldValue::Int(-3).raw(), -3);
        assert_eq!(FieldValue::Velocity { raw: 40, velocity: 1.5 }.raw(), 40);
    }
}
