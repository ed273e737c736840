//! Closed-loop scenarios on the simulation driver.

mod config_file;
mod pose_tracking;
mod sequence_run;
mod servo;
mod supervisor_lifecycle;
mod tcp_tracking;

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::state::{SafetyEvent, SafetyLevel};
use diffbot_common::hal::types::DigitalInput;
use diffbot_control_unit::control::pipeline::ControlPipeline;
use diffbot_control_unit::cycle::CycleRunner;
use diffbot_hal::{SimulationDriver, SimulationHandle};

// ── Helpers ──

/// Runner on a fresh simulation driver plus the handle to its plant.
pub(crate) fn sim_runner<P: ControlPipeline>(
    config: &ControlUnitConfig,
    pipeline: P,
) -> (CycleRunner<P>, SimulationHandle) {
    let driver = SimulationDriver::new();
    let sim = driver.handle();
    let runner = CycleRunner::new(config, Box::new(driver), pipeline).unwrap();
    (runner, sim)
}

/// Step until `done` holds. Returns the number of cycles taken.
pub(crate) fn run_until<P: ControlPipeline>(
    runner: &mut CycleRunner<P>,
    max_cycles: u64,
    mut done: impl FnMut(&CycleRunner<P>) -> bool,
) -> Option<u64> {
    for n in 1..=max_cycles {
        runner.step();
        if done(runner) {
            return Some(n);
        }
    }
    None
}

/// SystemOff → SystemOn.
pub(crate) fn start_up<P: ControlPipeline>(runner: &mut CycleRunner<P>) {
    let supervisor = runner.supervisor_handle();
    supervisor.trigger(SafetyEvent::DoSystemOn);
    runner.step();
    assert_eq!(supervisor.level(), SafetyLevel::SystemOn);
}

/// SystemOff → MotorPowerOn through a pause button press.
pub(crate) fn power_on<P: ControlPipeline>(runner: &mut CycleRunner<P>, sim: &SimulationHandle) {
    start_up(runner);
    sim.press(DigitalInput::Pause);
    runner.step();
    sim.release(DigitalInput::Pause);
    assert_eq!(runner.supervisor().level(), SafetyLevel::MotorPowerOn);
}
