//! Sequencer thread driving the pipeline while the runner cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::state::SafetyLevel;
use diffbot_control_unit::control::pipeline::{ControlPipeline, ControlSystem};
use diffbot_control_unit::cycle::CycleRunner;
use diffbot_control_unit::sequence::{SequenceError, Sequencer, Step};

use super::{sim_runner, start_up};

// ── Helpers ──

/// Step the runner, yielding to the sequence thread, until it finishes.
fn drive_until_finished<P: ControlPipeline>(
    runner: &mut CycleRunner<P>,
    thread: &JoinHandle<Result<(), SequenceError>>,
    max_cycles: u64,
) -> bool {
    for _ in 0..max_cycles {
        if thread.is_finished() {
            return true;
        }
        runner.step();
        std::thread::sleep(Duration::from_micros(50));
    }
    thread.is_finished()
}

// ── Tests ──

#[test]
fn sequence_powers_on_and_completes_move() {
    let config = ControlUnitConfig::default();
    let pipeline = ControlSystem::pose_tracking(&config);
    let targets = pipeline.targets();
    let (mut runner, _sim) = sim_runner(&config, pipeline);
    start_up(&mut runner);

    let running = Arc::new(AtomicBool::new(true));
    let thread = Sequencer::new(runner.supervisor_handle(), targets, Arc::clone(&running))
        .with_auto_power_on(true)
        .with_poll_interval(Duration::from_millis(1))
        .spawn(vec![Step::MoveTo { x: 0.2, y: 0.0, phi: None }], false)
        .unwrap();

    assert!(drive_until_finished(&mut runner, &thread, 20_000), "sequence did not finish");
    assert!(thread.join().unwrap().is_ok());

    let pose = runner.pipeline().pose();
    assert!((pose.x - 0.2).abs() < 2e-3, "x = {}", pose.x);
    assert!(runner.supervisor().level() >= SafetyLevel::MotorPowerOn);
}

#[test]
fn abort_stops_running_sequence() {
    let config = ControlUnitConfig::default();
    let pipeline = ControlSystem::pose_tracking(&config);
    let targets = pipeline.targets();
    let (mut runner, _sim) = sim_runner(&config, pipeline);
    start_up(&mut runner);

    let running = Arc::new(AtomicBool::new(true));
    let supervisor = runner.supervisor_handle();
    let thread = Sequencer::new(supervisor.clone(), targets, Arc::clone(&running))
        .with_auto_power_on(true)
        .with_poll_interval(Duration::from_millis(1))
        .spawn(vec![Step::MoveTo { x: 2.0, y: 0.0, phi: None }], true)
        .unwrap();

    for _ in 0..200 {
        runner.step();
        std::thread::sleep(Duration::from_micros(50));
    }
    supervisor.exit();
    runner.run_unpaced(500);
    assert!(supervisor.stop_requested());

    assert!(drive_until_finished(&mut runner, &thread, 1_000));
    assert!(matches!(thread.join().unwrap(), Err(SequenceError::Stopped)));
}

#[test]
fn clearing_running_flag_stops_sequence() {
    let config = ControlUnitConfig::default();
    let pipeline = ControlSystem::pose_tracking(&config);
    let targets = pipeline.targets();
    let (mut runner, _sim) = sim_runner(&config, pipeline);
    start_up(&mut runner);

    let running = Arc::new(AtomicBool::new(true));
    let thread = Sequencer::new(runner.supervisor_handle(), targets, Arc::clone(&running))
        .with_poll_interval(Duration::from_millis(1))
        .spawn(vec![Step::Wait { seconds: 60.0 }], false)
        .unwrap();

    // Without auto power-on the sequence waits for the pause button.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(runner.supervisor().level(), SafetyLevel::SystemOn);

    running.store(false, Ordering::SeqCst);
    assert!(matches!(thread.join().unwrap(), Err(SequenceError::Stopped)));
}
