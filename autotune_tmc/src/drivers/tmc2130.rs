//! TMC2130 register map (SPI, StallGuard2 via COOLCONF only).

use super::table::{RegisterSpec, field, signed};

/// Variant identifier.
pub const NAME: &str = "tmc2130";

/// Register table.
pub static REGISTERS: &[RegisterSpec] = &[
    RegisterSpec {
        name: "GCONF",
        address: 0x00,
        fields: &[
            field("i_scale_analog", 1 << 0),
            field("internal_rsense", 1 << 1),
            field("en_pwm_mode", 1 << 2),
            field("shaft", 1 << 4),
            field("small_hysteresis", 1 << 14),
        ],
    },
    RegisterSpec {
        name: "IHOLD_IRUN",
        address: 0x10,
        fields: &[
            field("ihold", 0x1f),
            field("irun", 0x1f << 8),
            field("iholddelay", 0x0f << 16),
        ],
    },
    RegisterSpec { name: "TPOWERDOWN", address: 0x11, fields: &[field("tpowerdown", 0xff)] },
    RegisterSpec { name: "TPWMTHRS", address: 0x13, fields: &[field("tpwmthrs", 0xfffff)] },
    RegisterSpec { name: "TCOOLTHRS", address: 0x14, fields: &[field("tcoolthrs", 0xfffff)] },
    RegisterSpec { name: "THIGH", address: 0x15, fields: &[field("thigh", 0xfffff)] },
    RegisterSpec {
        name: "CHOPCONF",
        address: 0x6c,
        fields: &[
            field("toff", 0x0f),
            field("hstrt", 0x07 << 4),
            field("hend", 0x0f << 7),
            field("fd3", 1 << 11),
            field("disfdcc", 1 << 12),
            field("chm", 1 << 14),
            field("tbl", 0x03 << 15),
            field("vsense", 1 << 17),
            field("vhighfs", 1 << 18),
            field("vhighchm", 1 << 19),
            field("mres", 0x0f << 24),
            field("intpol", 1 << 28),
            field("dedge", 1 << 29),
            field("diss2g", 1 << 30),
        ],
    },
    RegisterSpec {
        name: "COOLCONF",
        address: 0x6d,
        fields: &[
            field("semin", 0x0f),
            field("seup", 0x03 << 5),
            field("semax", 0x0f << 8),
            field("sedn", 0x03 << 13),
            field("seimin", 1 << 15),
            signed("sgt", 0x7f << 16),
            field("sfilt", 1 << 24),
        ],
    },
    RegisterSpec {
        name: "PWMCONF",
        address: 0x70,
        fields: &[
            field("pwm_ampl", 0xff),
            field("pwm_grad", 0xff << 8),
            field("pwm_freq", 0x03 << 16),
            field("pwm_autoscale", 1 << 18),
            field("pwm_symmetric", 1 << 19),
            field("freewheel", 0x03 << 20),
        ],
    },
];
