//! Driver capability classification.
//!
//! Variants of the TMC family expose stall detection and voltage
//! monitoring through different registers. The autotuner classifies the
//! bound driver once per tuning pass and branches on the resulting flags
//! instead of probing registers throughout the algorithm.

use autotune_common::driver::TmcDriver;
use bitflags::bitflags;

/// StallGuard4 threshold field (TMC2240 generation).
pub const SG4_THRESHOLD_FIELD: &str = "sg4_thrs";
/// StallGuard4 filter enable, next to the SG4 threshold.
pub const SG4_FILTER_FIELD: &str = "sg4_filt_en";
/// Legacy StallGuard threshold field (TMC2209 generation).
pub const LEGACY_THRESHOLD_FIELD: &str = "sgthrs";
/// Overvoltage comparator threshold field.
pub const OVERVOLTAGE_FIELD: &str = "overvoltage_vth";

bitflags! {
    /// Feature set of one driver instance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DriverCapabilities: u8 {
        /// `sg4_thrs` present.
        const SG4_STALL = 1 << 0;
        /// `sgthrs` present.
        const LEGACY_STALL = 1 << 1;
        /// `overvoltage_vth` present.
        const OVERVOLTAGE = 1 << 2;
    }
}

impl DriverCapabilities {
    /// Either generation of register-threshold stall detection.
    pub fn has_stall_detection(&self) -> bool {
        self.intersects(Self::SG4_STALL | Self::LEGACY_STALL)
    }
}

/// Classify `driver` by the registers it exposes.
pub fn classify(driver: &dyn TmcDriver) -> DriverCapabilities {
    let probes = [
        (SG4_THRESHOLD_FIELD, DriverCapabilities::SG4_STALL),
        (LEGACY_THRESHOLD_FIELD, DriverCapabilities::LEGACY_STALL),
        (OVERVOLTAGE_FIELD, DriverCapabilities::OVERVOLTAGE),
    ];
    probes
        .into_iter()
        .filter(|(field, _)| driver.lookup_register(field).is_some())
        .fold(DriverCapabilities::empty(), |caps, (_, flag)| caps | flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedTmc;
    use crate::drivers::{tmc2130, tmc2208, tmc2209, tmc2240, tmc2660, tmc5160};

    fn caps_of(variant: &'static str, table: &'static [crate::drivers::table::RegisterSpec]) -> DriverCapabilities {
        classify(&SimulatedTmc::new(variant, table, None))
    }

    #[test]
    fn tmc2240_has_sg4_and_overvoltage() {
        let caps = caps_of(tmc2240::NAME, tmc2240::REGISTERS);
        assert_eq!(caps, DriverCapabilities::SG4_STALL | DriverCapabilities::OVERVOLTAGE);
        assert!(caps.has_stall_detection());
    }

    #[test]
    fn tmc2209_has_legacy_stall_only() {
        let caps = caps_of(tmc2209::NAME, tmc2209::REGISTERS);
        assert_eq!(caps, DriverCapabilities::LEGACY_STALL);
        assert!(caps.has_stall_detection());
    }

    #[test]
    fn variants_without_stall_threshold() {
        for (name, table) in [
            (tmc2130::NAME, tmc2130::REGISTERS),
            (tmc2208::NAME, tmc2208::REGISTERS),
            (tmc2660::NAME, tmc2660::REGISTERS),
            (tmc5160::NAME, tmc5160::REGISTERS),
        ] {
            let caps = caps_of(name, table);
            assert!(caps.is_empty(), "{name} classified as {caps:?}");
            assert!(!caps.has_stall_detection());
        }
    }
}
