//! Pose-tracking pipeline in closed loop with the simulated plant.
//!
//! Validates:
//! - a planner target drives MotorPowerOn → SystemMoving
//! - the axle midpoint reaches the target position
//! - the robot settles back to MotorPowerOn once there

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::state::SafetyLevel;
use diffbot_common::motion::TargetPose;
use diffbot_control_unit::control::pipeline::ControlSystem;

use super::{power_on, run_until, sim_runner};

// ── Tests ──

#[test]
fn reaches_straight_ahead_target() {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ControlSystem::pose_tracking(&config));
    let planner = runner.pipeline().planner_handle().unwrap();
    power_on(&mut runner, &sim);

    let generation = planner.set_target(TargetPose::new(0.5, 0.0, 0.0));
    let started = run_until(&mut runner, 20, |r| {
        r.supervisor().level() == SafetyLevel::SystemMoving
    });
    assert!(started.is_some(), "large velocity error must start moving");

    let cycles = run_until(&mut runner, 6000, |_| planner.status().reached);
    assert!(cycles.is_some(), "target not reached");
    assert_eq!(planner.status().generation, generation);

    let pose = runner.pipeline().pose();
    assert!((pose.x - 0.5).abs() < 2e-3, "x = {}", pose.x);
    assert!(pose.y.abs() < 2e-3, "y = {}", pose.y);

    // Wheels travelled about the same distance as odometry reports.
    let travel = sim.wheel_positions();
    assert!(((travel[0] + travel[1]) / 2.0 - pose.x).abs() < 0.01);
}

#[test]
fn settles_after_reaching_target() {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ControlSystem::pose_tracking(&config));
    let planner = runner.pipeline().planner_handle().unwrap();
    power_on(&mut runner, &sim);

    planner.set_target(TargetPose::new(0.2, 0.0, 0.0));
    assert!(run_until(&mut runner, 6000, |_| planner.status().reached).is_some());

    let settled = run_until(&mut runner, 2000, |r| {
        r.supervisor().level() == SafetyLevel::MotorPowerOn
    });
    assert!(settled.is_some(), "robot did not settle");
    assert!(runner.pipeline().is_running());
}

#[test]
fn target_without_power_does_not_move() {
    let config = ControlUnitConfig::default();
    let (mut runner, sim) = sim_runner(&config, ControlSystem::pose_tracking(&config));
    let planner = runner.pipeline().planner_handle().unwrap();
    super::start_up(&mut runner);

    planner.set_target(TargetPose::new(0.5, 0.0, 0.0));
    runner.run_unpaced(200);

    assert_eq!(runner.supervisor().level(), SafetyLevel::SystemOn);
    assert!(!planner.status().reached);
    assert!(sim.wheel_positions().iter().all(|p| p.abs() < 1e-9));
}
