//! TMC2240 register map (StallGuard4 with filter, overvoltage comparator).

use super::table::{RegisterSpec, field, signed};

/// Variant identifier.
pub const NAME: &str = "tmc2240";

/// Register table.
pub static REGISTERS: &[RegisterSpec] = &[
    RegisterSpec {
        name: "GCONF",
        address: 0x00,
        fields: &[
            field("fast_standstill", 1 << 1),
            field("en_pwm_mode", 1 << 2),
            field("multistep_filt", 1 << 3),
            field("shaft", 1 << 4),
            field("small_hysteresis", 1 << 14),
            field("stop_enable", 1 << 15),
            field("direct_mode", 1 << 16),
        ],
    },
    RegisterSpec {
        name: "DRV_CONF",
        address: 0x0a,
        fields: &[field("current_range", 0x03), field("slope_control", 0x03 << 4)],
    },
    RegisterSpec { name: "GLOBAL_SCALER", address: 0x0b, fields: &[field("global_scaler", 0xff)] },
    RegisterSpec {
        name: "IHOLD_IRUN",
        address: 0x10,
        fields: &[
            field("ihold", 0x1f),
            field("irun", 0x1f << 8),
            field("iholddelay", 0x0f << 16),
            field("irundelay", 0x0f << 24),
        ],
    },
    RegisterSpec { name: "TPOWERDOWN", address: 0x11, fields: &[field("tpowerdown", 0xff)] },
    RegisterSpec { name: "TPWMTHRS", address: 0x13, fields: &[field("tpwmthrs", 0xfffff)] },
    RegisterSpec { name: "TCOOLTHRS", address: 0x14, fields: &[field("tcoolthrs", 0xfffff)] },
    RegisterSpec { name: "THIGH", address: 0x15, fields: &[field("thigh", 0xfffff)] },
    RegisterSpec {
        name: "OTW_OV_VTH",
        address: 0x52,
        fields: &[
            field("overvoltage_vth", 0xffff),
            field("overtempprewarning_vth", 0x1fff << 16),
        ],
    },
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
            field("vhighfs", 1 << 18),
            field("vhighchm", 1 << 19),
            field("tpfd", 0x0f << 20),
            field("mres", 0x0f << 24),
            field("intpol", 1 << 28),
            field("dedge", 1 << 29),
            field("diss2g", 1 << 30),
            field("diss2vs", 1 << 31),
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
            field("pwm_ofs", 0xff),
            field("pwm_grad", 0xff << 8),
            field("pwm_freq", 0x03 << 16),
            field("pwm_autoscale", 1 << 18),
            field("pwm_autograd", 1 << 19),
            field("freewheel", 0x03 << 20),
            field("pwm_meas_sd_enable", 1 << 22),
            field("pwm_dis_reg_stst", 1 << 23),
            field("pwm_reg", 0x0f << 24),
            field("pwm_lim", 0x0f << 28),
        ],
    },
    RegisterSpec {
        name: "SG4_THRS",
        address: 0x74,
        fields: &[
            field("sg4_thrs", 0xff),
            field("sg4_filt_en", 1 << 8),
            field("sg_angle_offset", 1 << 9),
        ],
    },
];
