//! TCP pipeline: position control of a point ahead of the axle.

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::state::PipelineVariant;
use diffbot_control_unit::control::pipeline::ControlSystem;

use super::{power_on, run_until, sim_runner};

// ── Tests ──

#[test]
fn tcp_reaches_offset_target() {
    let mut config = ControlUnitConfig::default();
    config.cycle.variant = PipelineVariant::Tcp;
    let (mut runner, sim) = sim_runner(&config, ControlSystem::tcp(&config));
    let tcp = runner.pipeline().tcp_handle().unwrap();
    assert!(runner.pipeline().planner_handle().is_none());
    power_on(&mut runner, &sim);

    tcp.set_target([0.3, 0.05]);
    let cycles = run_until(&mut runner, 3000, |_| tcp.status().reached);
    assert!(cycles.is_some(), "TCP target not reached");

    let pose = runner.pipeline().pose();
    assert!((pose.x - 0.3).abs() < 2e-3, "x = {}", pose.x);
    assert!((pose.y - 0.05).abs() < 2e-3, "y = {}", pose.y);
}

#[test]
fn tcp_pipeline_exposes_only_tcp_target() {
    let config = ControlUnitConfig::default();
    let system = ControlSystem::tcp(&config);
    let targets = diffbot_control_unit::control::pipeline::ControlPipeline::targets(&system);
    assert!(targets.tcp.is_some());
    assert!(targets.planner.is_none());
    assert!(targets.servo.is_none());
}
