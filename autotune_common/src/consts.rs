//! Driver-family constants.
//!
//! Values intrinsic to the Trinamic driver family and the defaults the
//! autotuner falls back to when the host cannot provide them.

/// Canonical service name (used for logging).
pub const SERVICE_NAME: &str = "autotune_tmc";

/// Supported driver variants, in section lookup order.
pub const TRINAMIC_DRIVERS: [&str; 6] = [
    "tmc2130", "tmc2208", "tmc2209", "tmc2240", "tmc2660", "tmc5160",
];

/// Clock frequency assumed when the driver cannot report one (Hz).
pub const DEFAULT_CLOCK_FREQUENCY_HZ: f64 = 12.5e6;

/// Largest raw value of the 20-bit velocity threshold registers.
pub const MAX_TSTEP: u32 = 0xfffff;

/// Overvoltage comparator resolution: 1 LSB = 9.732 mV.
pub const OVERVOLTAGE_LSB_VOLTS: f64 = 0.009732;

/// Upper bound for the StealthChop chopping frequency (Hz).
pub const MAX_CHOP_FREQUENCY_HZ: f64 = 55e3;

/// PWM divider codes with their chopping-frequency factor, highest code first.
pub const PWM_FREQ_FACTORS: [(u8, f64); 4] = [
    (3, 2.0 / 410.0),
    (2, 2.0 / 512.0),
    (1, 2.0 / 683.0),
    (0, 2.0 / 1024.0),
];

/// Target spreadcycle off-time (s) used when `toff` is left on auto.
pub const AUTO_TOFF_SECONDS: f64 = 0.85e-5;

/// Steppers that default to spreadcycle instead of stealthchop.
pub const DEFAULT_SPREADCYCLE_AXES: [&str; 4] =
    ["stepper_x", "stepper_y", "stepper_x1", "stepper_y1"];

/// Default full steps per mechanical rotation.
pub const DEFAULT_FULL_STEPS_PER_ROTATION: u32 = 200;
