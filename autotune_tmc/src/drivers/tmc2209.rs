//! TMC2209 register map: the TMC2208 map plus StallGuard4 (`sgthrs`) and
//! CoolStep.

use super::table::{RegisterSpec, field};
use super::tmc2208;

/// Variant identifier.
pub const NAME: &str = "tmc2209";

/// Register table.
pub static REGISTERS: &[RegisterSpec] = &[
    tmc2208::GCONF,
    tmc2208::IHOLD_IRUN,
    tmc2208::TPOWERDOWN,
    tmc2208::TPWMTHRS,
    RegisterSpec { name: "TCOOLTHRS", address: 0x14, fields: &[field("tcoolthrs", 0xfffff)] },
    RegisterSpec { name: "SGTHRS", address: 0x40, fields: &[field("sgthrs", 0xff)] },
    RegisterSpec {
        name: "COOLCONF",
        address: 0x42,
        fields: &[
            field("semin", 0x0f),
            field("seup", 0x03 << 5),
            field("semax", 0x0f << 8),
            field("sedn", 0x03 << 13),
            field("seimin", 1 << 15),
        ],
    },
    tmc2208::CHOPCONF,
    tmc2208::PWMCONF,
];
