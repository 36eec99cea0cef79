//! Host collaborators read at the start of every tuning pass.

use crate::config::{DriverSection, StepperSection};

/// Live run-current source of one driver.
pub trait CurrentControl: Send {
    /// Current run current (A). May change between tuning passes.
    fn run_current(&self) -> f64;
}

/// Kinematic properties of one stepper.
pub trait StepperKinematics: Send {
    /// Distance per full mechanical rotation (mm).
    fn rotation_distance(&self) -> f64;

    /// Distance per microstep (mm).
    fn step_distance(&self) -> f64;
}

/// Run current taken from the driver section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfiguredCurrent {
    run_current: f64,
}

impl ConfiguredCurrent {
    /// Wrap a fixed run current (A).
    pub fn new(run_current: f64) -> Self {
        Self { run_current }
    }
}

impl From<&DriverSection> for ConfiguredCurrent {
    fn from(section: &DriverSection) -> Self {
        Self::new(section.run_current)
    }
}

impl CurrentControl for ConfiguredCurrent {
    fn run_current(&self) -> f64 {
        self.run_current
    }
}

impl StepperKinematics for StepperSection {
    fn rotation_distance(&self) -> f64 {
        self.rotation_distance
    }

    fn step_distance(&self) -> f64 {
        StepperSection::step_distance(self)
    }
}
