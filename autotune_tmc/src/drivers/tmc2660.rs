//! TMC2660 register map (SPI, 20-bit datagrams, no velocity thresholds).

use super::table::{RegisterSpec, field, signed};

/// Variant identifier.
pub const NAME: &str = "tmc2660";

/// Register table.
pub static REGISTERS: &[RegisterSpec] = &[
    RegisterSpec {
        name: "DRVCTRL",
        address: 0x00,
        fields: &[field("mres", 0x0f), field("dedge", 1 << 8), field("intpol", 1 << 9)],
    },
    RegisterSpec {
        name: "CHOPCONF",
        address: 0x04,
        fields: &[
            field("toff", 0x0f),
            field("hstrt", 0x07 << 4),
            field("hend", 0x0f << 7),
            field("hdec", 0x03 << 11),
            field("rndtf", 1 << 13),
            field("chm", 1 << 14),
            field("tbl", 0x03 << 15),
        ],
    },
    RegisterSpec {
        name: "SMARTEN",
        address: 0x05,
        fields: &[
            field("semin", 0x0f),
            field("seup", 0x03 << 5),
            field("semax", 0x0f << 8),
            field("sedn", 0x03 << 13),
            field("seimin", 1 << 15),
        ],
    },
    RegisterSpec {
        name: "SGCSCONF",
        address: 0x06,
        fields: &[field("cs", 0x1f), signed("sgt", 0x7f << 8), field("sfilt", 1 << 16)],
    },
    RegisterSpec {
        name: "DRVCONF",
        address: 0x07,
        fields: &[
            field("rdsel", 0x03 << 4),
            field("vsense", 1 << 6),
            field("sdoff", 1 << 7),
            field("ts2g", 0x03 << 8),
            field("diss2g", 1 << 10),
            field("slpl", 0x03 << 12),
            field("slph", 0x03 << 14),
        ],
    },
];
