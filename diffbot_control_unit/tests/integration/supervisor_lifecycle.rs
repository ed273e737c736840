//! Safety supervisor against the simulated plant and buttons.
//!
//! Validates:
//! - pause button powers the motors, LEDs follow the level
//! - abort while moving brakes to a halt before shutting down
//! - mode button while moving brakes into Emergency, release resets it
//! - a HAL failure aborts the run

use std::time::Duration;

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::error::FaultFlags;
use diffbot_common::control_unit::state::{SafetyEvent, SafetyLevel};
use diffbot_common::hal::config::{HalConfig, MotorConfig};
use diffbot_common::hal::driver::{HalDriver, HalError};
use diffbot_common::hal::types::{DigitalInput, HalCommands, HalStatus};
use diffbot_common::motion::TargetPose;
use diffbot_control_unit::control::pipeline::ControlSystem;
use diffbot_control_unit::cycle::CycleRunner;
use diffbot_control_unit::safety::supervisor::TransitionResult;

use super::{power_on, run_until, sim_runner, start_up};

// ── Helpers ──

fn moving_runner() -> (CycleRunner<ControlSystem>, diffbot_hal::SimulationHandle) {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ControlSystem::pose_tracking(&config));
    let planner = runner.pipeline().planner_handle().unwrap();
    power_on(&mut runner, &sim);
    planner.set_target(TargetPose::new(1.0, 0.0, 0.0));
    let started = run_until(&mut runner, 20, |r| {
        r.supervisor().level() == SafetyLevel::SystemMoving
    });
    assert!(started.is_some());
    // Let the robot pick up speed.
    runner.run_unpaced(100);
    assert!(sim.wheel_velocities().iter().all(|v| *v > 0.05));
    (runner, sim)
}

/// Delivers `good_cycles` samples, then fails every cycle.
struct FlakyDriver {
    good_cycles: u32,
}

impl HalDriver for FlakyDriver {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn version(&self) -> &'static str {
        "0.0.0"
    }

    fn init(&mut self, _: &HalConfig, _: &MotorConfig) -> Result<(), HalError> {
        Ok(())
    }

    fn cycle(&mut self, _: &HalCommands, _: Duration) -> Result<HalStatus, HalError> {
        if self.good_cycles == 0 {
            return Err(HalError::CommunicationError("link down".into()));
        }
        self.good_cycles -= 1;
        Ok(HalStatus::default())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

// ── Tests ──

#[test]
fn leds_follow_power_on() {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ControlSystem::pose_tracking(&config));

    start_up(&mut runner);
    // SystemOn blinks both LEDs together.
    let first = runner.commands().outputs;
    runner.step();
    let second = runner.commands().outputs;
    assert_ne!(first.green, second.green);
    assert_ne!(first.red, second.red);

    sim.press(DigitalInput::Pause);
    runner.step();
    sim.release(DigitalInput::Pause);
    assert_eq!(runner.supervisor().level(), SafetyLevel::MotorPowerOn);

    runner.step();
    let leds = runner.commands().outputs;
    assert!(leds.green);
    assert!(!leds.red);

    // The LEDs reach the plant with the next HAL cycle.
    runner.step();
    assert_eq!(sim.outputs(), leds);
}

#[test]
fn abort_while_moving_brakes_then_shuts_down() {
    let (mut runner, sim) = moving_runner();
    let supervisor = runner.supervisor_handle();

    assert_eq!(supervisor.exit(), TransitionResult::Ok(SafetyLevel::Braking));
    let cycles = runner.run_unpaced(200);
    assert!(cycles < 200, "did not reach SystemOff");

    assert_eq!(supervisor.level(), SafetyLevel::SystemOff);
    assert!(supervisor.stop_requested());
    assert!(!runner.pipeline().is_running());
    assert!(sim.wheel_velocities().iter().all(|v| v.abs() < 5e-3));
    assert_eq!(sim.voltages(), [0.0, 0.0]);
}

#[test]
fn abort_while_idle_shuts_down_directly() {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ControlSystem::pose_tracking(&config));
    power_on(&mut runner, &sim);

    let supervisor = runner.supervisor_handle();
    assert_eq!(supervisor.exit(), TransitionResult::Ok(SafetyLevel::ShuttingDown));
    runner.run_unpaced(10);
    assert_eq!(supervisor.level(), SafetyLevel::SystemOff);
}

#[test]
fn mode_button_while_moving_latches_emergency() {
    let (mut runner, sim) = moving_runner();
    let supervisor = runner.supervisor_handle();

    sim.press(DigitalInput::Mode);
    runner.step();
    assert_eq!(supervisor.level(), SafetyLevel::EmergencyBraking);

    let halted = run_until(&mut runner, 200, |r| {
        r.supervisor().level() == SafetyLevel::Emergency
    });
    assert!(halted.is_some(), "emergency braking did not halt");
    runner.step();
    assert!(runner.commands().outputs.red);
    assert!(!runner.commands().outputs.green);

    // Held button keeps the latch; the sequence cannot power on meanwhile.
    runner.run_unpaced(50);
    assert_eq!(supervisor.level(), SafetyLevel::Emergency);
    assert!(matches!(
        supervisor.trigger(SafetyEvent::PowerOn),
        TransitionResult::Rejected(_)
    ));

    sim.release(DigitalInput::Mode);
    runner.step();
    assert_eq!(supervisor.level(), SafetyLevel::SystemOn);
}

#[test]
fn hal_failure_aborts() {
    let config = ControlUnitConfig::default();
    let mut runner = CycleRunner::new(
        &config,
        Box::new(FlakyDriver { good_cycles: 4 }),
        ControlSystem::pose_tracking(&config),
    )
    .unwrap();
    start_up(&mut runner);
    runner.run_unpaced(3);

    let flags = runner.step();
    assert!(flags.contains(FaultFlags::HAL_FAULT));
    runner.run_unpaced(10);
    assert_eq!(runner.supervisor().level(), SafetyLevel::SystemOff);
    assert!(runner.counters().critical_total() > 0);
}
