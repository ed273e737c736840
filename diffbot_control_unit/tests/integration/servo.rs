//! Single-joint servo on wheel channel 0.

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::state::{PipelineVariant, SafetyLevel};
use diffbot_control_unit::control::servo::ServoControlSystem;

use super::{power_on, run_until, sim_runner};

// ── Tests ──

#[test]
fn servo_tracks_setpoint() {
    let mut config = ControlUnitConfig::default();
    config.cycle.variant = PipelineVariant::Servo;
    let (mut runner, sim) = sim_runner(&config, ServoControlSystem::new(&config));
    let servo = runner.pipeline().handle();
    power_on(&mut runner, &sim);

    servo.set_setpoint(0.05);
    let cycles = run_until(&mut runner, 3000, |_| servo.status().reached);
    assert!(cycles.is_some(), "setpoint not reached");

    runner.run_unpaced(2000);
    let position = runner.pipeline().position();
    assert!((position - 0.05).abs() < 0.01, "position = {position}");
    assert!((sim.wheel_positions()[0] - position).abs() < 1e-9);
}

#[test]
fn servo_holds_position_without_guidance() {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ServoControlSystem::new(&config));
    let servo = runner.pipeline().handle();
    super::start_up(&mut runner);

    servo.set_setpoint(0.05);
    runner.run_unpaced(500);

    assert_eq!(runner.supervisor().level(), SafetyLevel::SystemOn);
    assert!(sim.wheel_positions()[0].abs() < 1e-6);
    assert!(!servo.status().reached);
}
