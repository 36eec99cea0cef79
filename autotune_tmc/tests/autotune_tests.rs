//! End-to-end autotuning tests.
//!
//! Config file on disk -> host -> register-shadow drivers -> plans, plus
//! the tuning scenarios against each driver variant.

use autotune_common::prelude::*;
use autotune_tmc::capability::{self, DriverCapabilities};
use autotune_tmc::drivers::simulation::SimulatedTmc;
use autotune_tmc::drivers::table::RegisterSpec;
use autotune_tmc::drivers::{tmc2130, tmc2208, tmc2209, tmc2240, tmc2660, tmc5160};
use autotune_tmc::{
    AutotuneError, AutotuneHost, CommandError, DriverRegistry, FieldValue, RuntimeContext, tune_driver,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
[stepper.stepper_y]
rotation_distance = 40.0
microsteps = 16

[stepper.stepper_z]
rotation_distance = 40.0
microsteps = 16

[tmc5160.stepper_y]
run_current = 1.2

[tmc2240.stepper_z]
run_current = 1.2

[autotune_tmc.stepper_y]
motor = "ldo-42sth48-2004ac"

[autotune_tmc.stepper_z]
motor = "ldo-42sth48-2004ac"
voltage = 24.0
"#;

fn variants() -> [(&'static str, &'static [RegisterSpec]); 6] {
    [
        (tmc2130::NAME, tmc2130::REGISTERS),
        (tmc2208::NAME, tmc2208::REGISTERS),
        (tmc2209::NAME, tmc2209::REGISTERS),
        (tmc2240::NAME, tmc2240::REGISTERS),
        (tmc2660::NAME, tmc2660::REGISTERS),
        (tmc5160::NAME, tmc5160::REGISTERS),
    ]
}

fn motor() -> MotorConstants {
    MotorConstants {
        resistance: 1.4,
        inductance: 0.003,
        holding_torque: 0.55,
        max_current: 2.0,
        steps_per_revolution: 200,
    }
}

fn scenario_context() -> RuntimeContext {
    RuntimeContext {
        run_current: 1.2,
        rotation_distance: 40.0,
        step_distance: 40.0 / 3200.0,
        mres: 4,
        clock_frequency: 12.5e6,
    }
}

fn simulated(variant: &'static str, table: &'static [RegisterSpec]) -> SimulatedTmc {
    let mut drv = SimulatedTmc::new(variant, table, None);
    drv.init_registers(4).unwrap();
    drv.take_writes();
    drv
}

fn host(dir: &TempDir) -> AutotuneHost {
    let path = dir.path().join("autotune.toml");
    fs::write(&path, CONFIG).unwrap();
    let config = load_config(&path).unwrap();
    let mut host = AutotuneHost::new(&config).unwrap();
    host.connect(&DriverRegistry::with_builtin_drivers()).unwrap();
    host
}

#[test]
fn test_stealth_scenario() {
    let dir = TempDir::new().unwrap();
    let mut host = host(&dir);
    let plans = host.ready().unwrap();
    let z = plans.iter().find(|p| p.stepper == "stepper_z").unwrap();

    assert_eq!(z.get("tcoolthrs"), Some(FieldValue::Velocity { raw: 305, velocity: 32.0 }));
    assert_eq!(z.get("tpwmthrs"), Some(FieldValue::Int(0)));
    assert_eq!(z.get("en_pwm_mode"), Some(FieldValue::Flag(true)));
    assert_eq!(z.get("pwm_freq"), Some(FieldValue::Int(2)));
    assert_eq!(z.get("toff"), Some(FieldValue::Int(3)));
    assert_eq!(z.get("hstrt"), Some(FieldValue::Int(2)));
    assert_eq!(z.get("hend"), Some(FieldValue::Int(3)));
}

#[test]
fn test_spreadcycle_axis_scenario() {
    let dir = TempDir::new().unwrap();
    let mut host = host(&dir);
    let plans = host.ready().unwrap();
    let y = plans.iter().find(|p| p.stepper == "stepper_y").unwrap();

    assert_eq!(y.get("en_pwm_mode"), Some(FieldValue::Flag(false)));
    assert_eq!(y.get("tpwmthrs"), Some(FieldValue::Int(0xfffff)));
    let driver = host.tuner("stepper_y").unwrap().driver().unwrap();
    assert_eq!(driver.get_field("tpwmthrs"), Some(0xfffff));
}

#[test]
fn test_tpwmthrs_max_for_each_variant_without_stealth() {
    let params = TuningParameters::with_stealth(false);
    for (name, table) in variants() {
        let mut drv = simulated(name, table);
        let plan = tune_driver("stepper_y", &mut drv, &motor(), &params, &scenario_context()).unwrap();
        if let Some(descriptor) = drv.lookup_register("tpwmthrs") {
            assert_eq!(plan.get("tpwmthrs"), Some(FieldValue::Int(descriptor.max_value() as i64)), "{name}");
        } else {
            assert!(plan.skipped.contains(&"tpwmthrs"), "{name}");
        }
    }
}

#[test]
fn test_capability_gating_per_variant() {
    let params = TuningParameters::with_stealth(true);
    for (name, table) in variants() {
        let mut drv = simulated(name, table);
        let caps = capability::classify(&drv);
        let plan = tune_driver("stepper_z", &mut drv, &motor(), &params, &scenario_context()).unwrap();

        assert_eq!(plan.contains("sg4_thrs"), caps.contains(DriverCapabilities::SG4_STALL), "{name}");
        assert_eq!(plan.contains("sg4_filt_en"), caps.contains(DriverCapabilities::SG4_STALL), "{name}");
        assert_eq!(plan.contains("sgthrs"), caps == DriverCapabilities::LEGACY_STALL, "{name}");
        if !caps.has_stall_detection() {
            for field in ["sg4_thrs", "sg4_filt_en", "sgthrs"] {
                assert!(!plan.contains(field), "{name} wrote {field}");
            }
        }
    }
}

#[test]
fn test_every_write_hits_its_register_once() {
    let params = TuningParameters::with_stealth(true);
    for (name, table) in variants() {
        let mut drv = simulated(name, table);
        let plan = tune_driver("stepper_z", &mut drv, &motor(), &params, &scenario_context()).unwrap();
        let writes = drv.take_writes();
        assert_eq!(writes.len(), plan.len(), "{name}");
        for (entry, write) in plan.entries.iter().zip(&writes) {
            let descriptor = drv.lookup_register(entry.field).unwrap();
            assert_eq!(write.register, descriptor.register, "{name} {}", entry.field);
        }
    }
}

#[test]
fn test_signed_sgt_reaches_register() {
    let mut params = TuningParameters::with_stealth(true);
    params.sgt = -12;
    let mut drv = simulated(tmc5160::NAME, tmc5160::REGISTERS);
    tune_driver("stepper_z", &mut drv, &motor(), &params, &scenario_context()).unwrap();
    assert_eq!(drv.get_field("sgt"), Some(-12));
}

#[test]
fn test_retune_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut host = host(&dir);
    host.ready().unwrap();
    let first = host.dispatch("AUTOTUNE_TMC STEPPER=stepper_z").unwrap();
    let second = host.dispatch("AUTOTUNE_TMC STEPPER=stepper_z").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn test_command_flow() {
    let dir = TempDir::new().unwrap();
    let mut host = host(&dir);
    host.ready().unwrap();

    let plan = host
        .dispatch("autotune_tmc stepper=stepper_z stealth_and_spread=1 overvoltage_vth=24")
        .unwrap();
    assert_eq!(plan.get("overvoltage_vth"), Some(FieldValue::Int(2466)));
    assert!(matches!(plan.get("tpwmthrs"), Some(FieldValue::Velocity { .. })));

    let params = host.tuner("stepper_z").unwrap().parameters();
    assert!(params.stealth_and_spread);
    assert_eq!(params.overvoltage_vth, Some(24.0));

    let err = host.dispatch("AUTOTUNE_TMC STEPPER=stepper_z EXTRA_HYSTERESIS=9").unwrap_err();
    assert!(matches!(err, AutotuneError::Command(CommandError::OutOfRange(_))));
}

#[test]
fn test_construction_fails_for_unknown_motor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("autotune.toml");
    fs::write(&path, CONFIG.replace("motor = \"ldo-42sth48-2004ac\"\nvoltage", "motor = \"nope\"\nvoltage")).unwrap();
    let config = load_config(&path).unwrap();
    let err = AutotuneHost::new(&config).err().unwrap();
    assert!(matches!(err, AutotuneError::MotorNotFound(ref name) if name == "nope"));
    assert!(err.to_string().contains("[motor_constants.nope]"));
}

#[test]
fn test_sample_config_tunes_every_stepper() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("autotune_tmc.toml");
    let config = load_config(&path).unwrap();
    let mut host = AutotuneHost::new(&config).unwrap();
    host.connect(&DriverRegistry::with_builtin_drivers()).unwrap();
    let plans = host.ready().unwrap();

    let steppers: Vec<_> = plans.iter().map(|p| p.stepper.as_str()).collect();
    assert_eq!(steppers, ["stepper_x", "stepper_y", "stepper_z"]);
    assert_eq!(plans[0].get("en_pwm_mode"), None);
    assert_eq!(plans[1].get("en_pwm_mode"), Some(FieldValue::Flag(false)));
    assert_eq!(plans[1].get("sgt"), Some(FieldValue::Int(-2)));
    assert_eq!(plans[2].get("overvoltage_vth"), Some(FieldValue::Int(2877)));
    assert_eq!(host.tuner("stepper_y").unwrap().clock_frequency(), Some(12.0e6));
}
