//! Threshold and chopper planning.
//!
//! Every value the orchestrator writes is derived here from the motor
//! model, the driver's capabilities, the tuning knobs and the live
//! operating point. All functions are pure.

use crate::capability::DriverCapabilities;
use autotune_common::consts::{
    AUTO_TOFF_SECONDS, MAX_CHOP_FREQUENCY_HZ, OVERVOLTAGE_LSB_VOLTS, PWM_FREQ_FACTORS,
};
use autotune_common::motor::MotorModel;
use autotune_common::tuning::TuningParameters;
use serde::Serialize;

/// Operating point read fresh at the start of every pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuntimeContext {
    /// Live run current (A).
    pub run_current: f64,
    /// Distance per mechanical rotation (mm).
    pub rotation_distance: f64,
    /// Distance per microstep (mm).
    pub step_distance: f64,
    /// Microstep resolution code.
    pub mres: u8,
    /// Driver clock frequency (Hz).
    pub clock_frequency: f64,
}

/// Which stall threshold register to program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StallThreshold {
    /// `sg4_thrs` plus its filter.
    Sg4(u8),
    /// `sgthrs`.
    Legacy(u8),
    /// No threshold register on this variant.
    Unsupported,
}

/// Derived values of one tuning pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPlan {
    /// Hysteresis start.
    pub hstrt: i64,
    /// Hysteresis end.
    pub hend: i64,
    /// PWM divider code.
    pub pwm_freq: u8,
    /// Stall threshold selection.
    pub stall_threshold: StallThreshold,
    /// Velocity where PWM current control runs out of voltage.
    pub vmaxpwm: f64,
    /// Raw overvoltage threshold, when configured and supported.
    pub overvoltage_vth: Option<u32>,
    /// CoolStep lower velocity threshold.
    pub coolthrs: f64,
    /// Stealthchop/spreadcycle transition velocity.
    pub pwmthrs: f64,
    /// Full-step switch-over velocity.
    pub vhigh: f64,
    /// Spreadcycle off-time code written to hardware.
    pub toff: u8,
    /// Stealthchop PWM gradient.
    pub pwm_grad: i64,
    /// Stealthchop PWM offset.
    pub pwm_ofs: i64,
}

/// Highest PWM divider code keeping the chopping frequency under 55 kHz.
///
/// Falls back to code 0 when no divider is slow enough.
pub fn chop_frequency_code(clock_frequency: f64) -> u8 {
    PWM_FREQ_FACTORS
        .iter()
        .find(|(_, factor)| clock_frequency * factor < MAX_CHOP_FREQUENCY_HZ)
        .map(|(code, _)| *code)
        .unwrap_or(0)
}

/// Spreadcycle off-time code: the configured value, or for 0 the code
/// closest above an 8.5 µs off-time at the live clock. Never below 1.
pub fn spreadcycle_toff(toff: u8, clock_frequency: f64) -> u8 {
    if toff > 0 {
        return toff;
    }
    ((AUTO_TOFF_SECONDS * clock_frequency - 12.0) / 32.0).ceil().max(1.0) as u8
}

/// Raw overvoltage comparator value for `volts`.
pub fn overvoltage_raw(volts: f64) -> u32 {
    (volts / OVERVOLTAGE_LSB_VOLTS).floor() as u32
}

/// CoolStep lower velocity threshold: about one revolution every two
/// seconds is as slow as stall detection works.
pub fn coolstep_threshold(rotation_distance: f64) -> f64 {
    0.8 * rotation_distance
}

/// Stealthchop/spreadcycle transition velocity.
///
/// With stall detection the transition sits above the CoolStep threshold.
/// Without it, the transition stays well below so sensorless homing keeps
/// working alongside CoolStep.
pub fn pwm_threshold(capabilities: DriverCapabilities, vmaxpwm: f64, coolthrs: f64) -> f64 {
    if capabilities.has_stall_detection() {
        f64::max(0.2 * vmaxpwm, 1.125 * coolthrs)
    } else {
        0.5 * coolthrs
    }
}

/// Full-step switch-over velocity.
pub fn high_speed_threshold(vmaxpwm: f64) -> f64 {
    1.2 * vmaxpwm
}

/// Stall threshold register selection.
pub fn stall_threshold(capabilities: DriverCapabilities, sg4_thrs: u8) -> StallThreshold {
    if capabilities.contains(DriverCapabilities::SG4_STALL) {
        StallThreshold::Sg4(sg4_thrs)
    } else if capabilities.contains(DriverCapabilities::LEGACY_STALL) {
        StallThreshold::Legacy(sg4_thrs)
    } else {
        StallThreshold::Unsupported
    }
}

/// Derives a [`ThresholdPlan`] for one motor.
pub struct ThresholdPlanner<'a> {
    motor: &'a dyn MotorModel,
    capabilities: DriverCapabilities,
}

impl<'a> ThresholdPlanner<'a> {
    /// Planner for `motor` on a driver with `capabilities`.
    pub fn new(motor: &'a dyn MotorModel, capabilities: DriverCapabilities) -> Self {
        Self { motor, capabilities }
    }

    /// Compute every derived value.
    pub fn plan(&self, params: &TuningParameters, ctx: &RuntimeContext) -> ThresholdPlan {
        let fclk = ctx.clock_frequency;
        let (hstrt, hend) = self.motor.hysteresis(
            params.voltage,
            ctx.run_current,
            params.tbl,
            params.toff,
            fclk,
            params.extra_hysteresis,
        );

        let vmaxpwm = self.motor.max_pwm_rps(params.voltage, ctx.run_current) * ctx.rotation_distance;
        let overvoltage_vth = params
            .overvoltage_vth
            .filter(|_| self.capabilities.contains(DriverCapabilities::OVERVOLTAGE))
            .map(overvoltage_raw);
        let coolthrs = coolstep_threshold(ctx.rotation_distance);

        ThresholdPlan {
            hstrt,
            hend,
            pwm_freq: chop_frequency_code(fclk),
            stall_threshold: stall_threshold(self.capabilities, params.sg4_thrs),
            vmaxpwm,
            overvoltage_vth,
            coolthrs,
            pwmthrs: pwm_threshold(self.capabilities, vmaxpwm, coolthrs),
            vhigh: high_speed_threshold(vmaxpwm),
            toff: spreadcycle_toff(params.toff, fclk),
            pwm_grad: self.motor.pwm_gradient(params.voltage, fclk),
            pwm_ofs: self.motor.pwm_offset(params.voltage, ctx.run_current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotune_common::motor::MotorConstants;
    use std::sync::atomic::{AtomicU8, Ordering};

    fn motor() -> MotorConstants {
        MotorConstants {
            resistance: 1.4,
            inductance: 0.003,
            holding_torque: 0.4,
            max_current: 2.0,
            steps_per_revolution: 200,
        }
    }

    fn context() -> RuntimeContext {
        RuntimeContext {
            run_current: 1.2,
            rotation_distance: 40.0,
            step_distance: 40.0 / 3200.0,
            mres: 4,
            clock_frequency: 12.5e6,
        }
    }

    #[test]
    fn chop_frequency_picks_highest_code_below_limit() {
        // 12.5 MHz: code 3 gives 60.9 kHz, code 2 gives 48.8 kHz
        assert_eq!(chop_frequency_code(12.5e6), 2);
        // 10 MHz: code 3 gives 48.8 kHz
        assert_eq!(chop_frequency_code(10e6), 3);
        // 16 MHz: 78 / 62.5 / 46.9 kHz
        assert_eq!(chop_frequency_code(16e6), 1);
        // 40 MHz: even code 0 gives 78 kHz, fall back to 0
        assert_eq!(chop_frequency_code(40e6), 0);
    }

    #[test]
    fn chop_frequency_is_maximal_for_every_clock() {
        for step in 1..=400 {
            let fclk = step as f64 * 0.1e6;
            let code = chop_frequency_code(fclk);
            let factor = PWM_FREQ_FACTORS.iter().find(|(c, _)| *c == code).unwrap().1;
            let higher_fits = PWM_FREQ_FACTORS
                .iter()
                .filter(|(c, _)| *c > code)
                .any(|(_, f)| fclk * f < MAX_CHOP_FREQUENCY_HZ);
            assert!(!higher_fits, "fclk={fclk} code={code}");
            if code > 0 {
                assert!(fclk * factor < MAX_CHOP_FREQUENCY_HZ);
            }
        }
    }

    #[test]
    fn auto_toff_follows_clock() {
        // ceil((106.25 - 12) / 32) = 3
        assert_eq!(spreadcycle_toff(0, 12.5e6), 3);
        // ceil((102 - 12) / 32) = 3
        assert_eq!(spreadcycle_toff(0, 12e6), 3);
        // ceil((212.5 - 12) / 32) = 7
        assert_eq!(spreadcycle_toff(0, 25e6), 7);
    }

    #[test]
    fn explicit_toff_ignores_clock() {
        for fclk in [4e6, 12.5e6, 25e6] {
            assert_eq!(spreadcycle_toff(5, fclk), 5);
        }
    }

    #[test]
    fn auto_toff_never_zero() {
        assert_eq!(spreadcycle_toff(0, 1e6), 1);
    }

    #[test]
    fn overvoltage_conversion() {
        assert_eq!(overvoltage_raw(24.0), 2466);
    }

    #[test]
    fn pwm_threshold_with_stall_detection() {
        let caps = DriverCapabilities::LEGACY_STALL;
        assert_eq!(pwm_threshold(caps, 100.0, 32.0), 36.0);
        assert_eq!(pwm_threshold(caps, 500.0, 32.0), 100.0);
        let mut last = 0.0;
        for vmax in [0.0, 50.0, 150.0, 300.0, 900.0] {
            let t = pwm_threshold(DriverCapabilities::SG4_STALL, vmax, 32.0);
            assert!(t >= last);
            last = t;
        }
    }

    #[test]
    fn pwm_threshold_without_stall_detection_ignores_vmaxpwm() {
        let caps = DriverCapabilities::OVERVOLTAGE;
        assert_eq!(pwm_threshold(caps, 10.0, 32.0), 16.0);
        assert_eq!(pwm_threshold(caps, 1000.0, 32.0), 16.0);
    }

    #[test]
    fn stall_threshold_selection() {
        let both = DriverCapabilities::SG4_STALL | DriverCapabilities::LEGACY_STALL;
        assert_eq!(stall_threshold(both, 10), StallThreshold::Sg4(10));
        assert_eq!(stall_threshold(DriverCapabilities::LEGACY_STALL, 10), StallThreshold::Legacy(10));
        assert_eq!(stall_threshold(DriverCapabilities::empty(), 10), StallThreshold::Unsupported);
    }

    #[test]
    fn plan_scenario_values() {
        let m = motor();
        let params = TuningParameters::with_stealth(true);
        let plan = ThresholdPlanner::new(&m, DriverCapabilities::SG4_STALL).plan(&params, &context());

        assert_eq!(plan.coolthrs, 32.0);
        assert_eq!((plan.hstrt, plan.hend), (2, 3));
        assert_eq!(plan.toff, 3);
        assert_eq!(plan.pwm_freq, 2);
        let expected_vmax = m.max_pwm_rps(24.0, 1.2) * 40.0;
        assert!((plan.vmaxpwm - expected_vmax).abs() < 1e-9);
        assert!((plan.vhigh - 1.2 * expected_vmax).abs() < 1e-9);
        assert_eq!(plan.pwmthrs, f64::max(0.2 * expected_vmax, 36.0));
        assert_eq!(plan.pwm_grad, m.pwm_gradient(24.0, 12.5e6));
        assert_eq!(plan.pwm_ofs, m.pwm_offset(24.0, 1.2));
        assert!(plan.overvoltage_vth.is_none());
    }

    #[test]
    fn overvoltage_needs_register_and_setting() {
        let m = motor();
        let mut params = TuningParameters::with_stealth(true);
        params.overvoltage_vth = Some(24.0);

        let without = ThresholdPlanner::new(&m, DriverCapabilities::SG4_STALL).plan(&params, &context());
        assert!(without.overvoltage_vth.is_none());

        let caps = DriverCapabilities::SG4_STALL | DriverCapabilities::OVERVOLTAGE;
        let with = ThresholdPlanner::new(&m, caps).plan(&params, &context());
        assert_eq!(with.overvoltage_vth, Some(2466));
    }

    /// Records the `toff` the planner hands to the motor model.
    struct RecordingMotor {
        inner: MotorConstants,
        toff: AtomicU8,
    }

    impl MotorModel for RecordingMotor {
        fn hysteresis(&self, volts: f64, current: f64, tbl: u8, toff: u8, fclk: f64, extra: u8) -> (i64, i64) {
            self.toff.store(toff, Ordering::Relaxed);
            self.inner.hysteresis(volts, current, tbl, toff, fclk, extra)
        }

        fn max_pwm_rps(&self, volts: f64, current: f64) -> f64 {
            self.inner.max_pwm_rps(volts, current)
        }

        fn pwm_gradient(&self, volts: f64, fclk: f64) -> i64 {
            self.inner.pwm_gradient(volts, fclk)
        }

        fn pwm_offset(&self, volts: f64, current: f64) -> i64 {
            self.inner.pwm_offset(volts, current)
        }
    }

    #[test]
    fn hysteresis_uses_toff_knob_not_resolved_off_time() {
        let m = RecordingMotor {
            inner: motor(),
            toff: AtomicU8::new(u8::MAX),
        };
        let mut params = TuningParameters::with_stealth(false);

        let auto = ThresholdPlanner::new(&m, DriverCapabilities::SG4_STALL).plan(&params, &context());
        assert_eq!(m.toff.load(Ordering::Relaxed), 0);
        assert_eq!(auto.toff, 3);
        assert_eq!((auto.hstrt, auto.hend), (2, 3));

        params.toff = 3;
        let explicit = ThresholdPlanner::new(&m, DriverCapabilities::SG4_STALL).plan(&params, &context());
        assert_eq!(m.toff.load(Ordering::Relaxed), 3);
        assert_eq!(explicit.toff, 3);
        assert_eq!((explicit.hstrt, explicit.hend), (6, 3));
    }
}
