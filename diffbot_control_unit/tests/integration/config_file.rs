//! Configuration file → driver registry → running loop.

use std::io::Write;
use std::path::Path;

use diffbot_common::control_unit::state::{PipelineVariant, SafetyEvent, SafetyLevel};
use diffbot_control_unit::config::{ConfigError, load_config};
use diffbot_control_unit::control::pipeline::ControlSystem;
use diffbot_control_unit::cycle::CycleRunner;
use diffbot_hal::DriverRegistry;

// ── Tests ──

#[test]
fn shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/diffbot.toml");
    let config = load_config(&path).unwrap();
    assert_eq!(config.hal.driver, "simulation");
    assert_eq!(config.cycle.variant, PipelineVariant::Pose);
    assert!((config.motor.reflected_inertia() - 0.046_525_558_663_09).abs() < 1e-9);
}

#[test]
fn config_file_drives_registry_and_runner() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[cycle]
cycle_time_us = 5000
variant = "tcp"

[hal]
driver = "simulation"

[robot]
tcp_lever_arm = 0.2
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.cycle.variant, PipelineVariant::Tcp);

    let driver = DriverRegistry::with_builtin_drivers()
        .create_driver(&config.hal.driver)
        .unwrap();
    let mut runner = CycleRunner::new(&config, driver, ControlSystem::tcp(&config)).unwrap();
    let supervisor = runner.supervisor_handle();
    supervisor.trigger(SafetyEvent::DoSystemOn);

    assert_eq!(runner.run_unpaced(10), 10);
    assert_eq!(runner.cycles(), 10);
    assert_eq!(supervisor.level(), SafetyLevel::SystemOn);
    assert_eq!(runner.last_status().timestamp_ns, 10 * 5_000_000);
}

#[test]
fn unknown_driver_is_rejected() {
    let registry = DriverRegistry::with_builtin_drivers();
    assert!(registry.create_driver("ethercat").is_err());
}

#[test]
fn invalid_file_reports_validation_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[cycle]\ncycle_time_us = 0").unwrap();
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)), "{err}");
}
