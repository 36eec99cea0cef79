//! TMC2208 register map (UART, no stall detection).
//!
//! The register definitions are shared with the TMC2209, which extends
//! this map with its StallGuard4 and CoolStep registers.

use super::table::{RegisterSpec, field};

/// Variant identifier.
pub const NAME: &str = "tmc2208";

/// Global configuration.
pub const GCONF: RegisterSpec = RegisterSpec {
    name: "GCONF",
    address: 0x00,
    fields: &[
        field("i_scale_analog", 1 << 0),
        field("internal_rsense", 1 << 1),
        field("en_spreadcycle", 1 << 2),
        field("shaft", 1 << 3),
        field("index_otpw", 1 << 4),
        field("index_step", 1 << 5),
        field("pdn_disable", 1 << 6),
        field("mstep_reg_select", 1 << 7),
        field("multistep_filt", 1 << 8),
    ],
};

/// Hold and run current.
pub const IHOLD_IRUN: RegisterSpec = RegisterSpec {
    name: "IHOLD_IRUN",
    address: 0x10,
    fields: &[
        field("ihold", 0x1f),
        field("irun", 0x1f << 8),
        field("iholddelay", 0x0f << 16),
    ],
};

/// Standstill power-down delay.
pub const TPOWERDOWN: RegisterSpec =
    RegisterSpec { name: "TPOWERDOWN", address: 0x11, fields: &[field("tpowerdown", 0xff)] };

/// Stealthchop upper velocity threshold.
pub const TPWMTHRS: RegisterSpec =
    RegisterSpec { name: "TPWMTHRS", address: 0x13, fields: &[field("tpwmthrs", 0xfffff)] };

/// Chopper configuration.
pub const CHOPCONF: RegisterSpec = RegisterSpec {
    name: "CHOPCONF",
    address: 0x6c,
    fields: &[
        field("toff", 0x0f),
        field("hstrt", 0x07 << 4),
        field("hend", 0x0f << 7),
        field("tbl", 0x03 << 15),
        field("vsense", 1 << 17),
        field("mres", 0x0f << 24),
        field("intpol", 1 << 28),
        field("dedge", 1 << 29),
        field("diss2g", 1 << 30),
        field("diss2vs", 1 << 31),
    ],
};

/// Stealthchop PWM configuration.
pub const PWMCONF: RegisterSpec = RegisterSpec {
    name: "PWMCONF",
    address: 0x70,
    fields: &[
        field("pwm_ofs", 0xff),
        field("pwm_grad", 0xff << 8),
        field("pwm_freq", 0x03 << 16),
        field("pwm_autoscale", 1 << 18),
        field("pwm_autograd", 1 << 19),
        field("freewheel", 0x03 << 20),
        field("pwm_reg", 0x0f << 24),
        field("pwm_lim", 0x0f << 28),
    ],
};

/// Register table.
pub static REGISTERS: &[RegisterSpec] = &[GCONF, IHOLD_IRUN, TPOWERDOWN, TPWMTHRS, CHOPCONF, PWMCONF];
