//! Motion sequences.
//!
//! A sequence is a list of [`Step`]s executed on its own thread against the
//! pipeline's target handles and the supervisor handle. Motion steps wait
//! until the pipeline marks the new target reached; while the supervisor is
//! below `MotorPowerOn` (emergency, operator power-off) the sequence pauses.
//!
//! Sequences can be loaded from TOML:
//!
//! ```toml
//! repeat = true
//!
//! [[steps]]
//! step = "move_to"
//! x = 0.5
//! y = 0.0
//! phi = 0.0
//!
//! [[steps]]
//! step = "wait"
//! seconds = 1.0
//! ```

use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use diffbot_common::control_unit::state::{PipelineVariant, SafetyEvent, SafetyLevel};
use diffbot_common::motion::TargetPose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::control::pipeline::MotionTargets;
use crate::control::target::{TargetHandle, TargetStatus};
use crate::safety::supervisor::SupervisorHandle;

/// Default polling interval for level and target checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One sequence step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Drive the axle midpoint to a pose; `phi = None` leaves the heading free.
    MoveTo {
        /// Target x [m].
        x: f64,
        /// Target y [m].
        y: f64,
        /// Target heading [rad].
        #[serde(default)]
        phi: Option<f64>,
    },
    /// Drive the TCP to a point.
    MoveTcpTo {
        /// Target x [m].
        x: f64,
        /// Target y [m].
        y: f64,
    },
    /// Move the servo joint to a position.
    MoveServoTo {
        /// Joint setpoint [m].
        position: f64,
    },
    /// Pause.
    Wait {
        /// Duration [s].
        seconds: f64,
    },
}

/// A sequence as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceFile {
    /// Restart from the first step after the last one.
    #[serde(default)]
    pub repeat: bool,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

/// Sequence errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceError {
    /// The running flag was cleared or the supervisor shut down.
    Stopped,
    /// The pipeline has no handle for this kind of step.
    MissingTarget(&'static str),
    /// A step has non-finite or negative parameters.
    InvalidStep(Step),
    /// Sequence file could not be read or parsed.
    Load(String),
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "sequence stopped"),
            Self::MissingTarget(kind) => write!(f, "pipeline has no {kind} target"),
            Self::InvalidStep(step) => write!(f, "invalid step: {step:?}"),
            Self::Load(e) => write!(f, "sequence load error: {e}"),
        }
    }
}

impl std::error::Error for SequenceError {}

impl Step {
    fn validate(&self) -> Result<(), SequenceError> {
        let ok = match *self {
            Self::MoveTo { x, y, phi } => {
                x.is_finite() && y.is_finite() && phi.is_none_or(f64::is_finite)
            }
            Self::MoveTcpTo { x, y } => x.is_finite() && y.is_finite(),
            Self::MoveServoTo { position } => position.is_finite(),
            Self::Wait { seconds } => Duration::try_from_secs_f64(seconds)
                .ok()
                .and_then(|d| Instant::now().checked_add(d))
                .is_some(),
        };
        if ok {
            Ok(())
        } else {
            Err(SequenceError::InvalidStep(*self))
        }
    }
}

/// Load and validate a sequence file.
pub fn load_sequence(path: &Path) -> Result<SequenceFile, SequenceError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SequenceError::Load(format!("failed to read {}: {e}", path.display())))?;
    parse_sequence(&text)
}

/// Parse and validate a sequence from TOML text.
pub fn parse_sequence(text: &str) -> Result<SequenceFile, SequenceError> {
    let file: SequenceFile = toml::from_str(text).map_err(|e| SequenceError::Load(e.to_string()))?;
    file.steps.iter().try_for_each(Step::validate)?;
    Ok(file)
}

/// Square (0.5,0,0) → (0.5,0.5,π/2) → (0,0.5,π) → (0,0,0), one second at each corner.
pub fn square_path() -> Vec<Step> {
    let corners = [(0.5, 0.0, 0.0), (0.5, 0.5, FRAC_PI_2), (0.0, 0.5, PI), (0.0, 0.0, 0.0)];
    corners
        .into_iter()
        .flat_map(|(x, y, phi)| {
            [
                Step::MoveTo {
                    x,
                    y,
                    phi: Some(phi),
                },
                Step::Wait { seconds: 1.0 },
            ]
        })
        .collect()
}

/// Built-in sequence for a pipeline variant.
pub fn default_steps(variant: PipelineVariant) -> Vec<Step> {
    match variant {
        PipelineVariant::Pose => square_path(),
        PipelineVariant::Tcp => [(0.5, 0.0), (0.5, 0.5), (0.0, 0.5), (0.0, 0.0)]
            .into_iter()
            .flat_map(|(x, y)| [Step::MoveTcpTo { x, y }, Step::Wait { seconds: 1.0 }])
            .collect(),
        PipelineVariant::Servo => vec![
            Step::MoveServoTo { position: 0.05 },
            Step::Wait { seconds: 1.0 },
            Step::MoveServoTo { position: 0.0 },
            Step::Wait { seconds: 1.0 },
        ],
    }
}

/// Executes steps against a running control unit.
#[derive(Debug, Clone)]
pub struct Sequencer {
    supervisor: SupervisorHandle,
    targets: MotionTargets,
    running: Arc<AtomicBool>,
    poll: Duration,
    auto_power_on: bool,
}

impl Sequencer {
    /// New sequencer. Clearing `running` stops it at the next poll.
    pub fn new(supervisor: SupervisorHandle, targets: MotionTargets, running: Arc<AtomicBool>) -> Self {
        Self {
            supervisor,
            targets,
            running,
            poll: POLL_INTERVAL,
            auto_power_on: false,
        }
    }

    /// Raise `PowerOn` whenever the supervisor sits in `SystemOn` while waiting.
    pub fn with_auto_power_on(mut self, enabled: bool) -> Self {
        self.auto_power_on = enabled;
        self
    }

    /// Polling interval.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    fn check_running(&self) -> Result<(), SequenceError> {
        if self.running.load(Ordering::SeqCst) && !self.supervisor.stop_requested() {
            Ok(())
        } else {
            Err(SequenceError::Stopped)
        }
    }

    /// Block until the supervisor level is at least `min`.
    pub fn wait_for_level(&self, min: SafetyLevel) -> Result<(), SequenceError> {
        let mut logged = false;
        loop {
            self.check_running()?;
            let level = self.supervisor.level();
            if level >= min {
                return Ok(());
            }
            if self.auto_power_on && level == SafetyLevel::SystemOn {
                self.supervisor.trigger(SafetyEvent::PowerOn);
                continue;
            }
            if !logged {
                info!(?level, ?min, "waiting for safety level");
                logged = true;
            }
            std::thread::sleep(self.poll);
        }
    }

    fn wait_reached<T: Copy>(&self, handle: &TargetHandle<T>, generation: u64) -> Result<(), SequenceError> {
        loop {
            self.wait_for_level(SafetyLevel::MotorPowerOn)?;
            let TargetStatus {
                reached,
                generation: current,
            } = handle.status();
            if reached && current == generation {
                return Ok(());
            }
            std::thread::sleep(self.poll);
        }
    }

    /// Execute one step; motion steps return once the target is reached.
    pub fn execute(&self, step: &Step) -> Result<(), SequenceError> {
        step.validate()?;
        self.check_running()?;
        match *step {
            Step::MoveTo { x, y, phi } => {
                let handle = self.targets.planner.as_ref().ok_or(SequenceError::MissingTarget("planner"))?;
                info!(x, y, ?phi, "move to");
                let generation = handle.set_target(TargetPose { x, y, phi });
                self.wait_reached(handle, generation)
            }
            Step::MoveTcpTo { x, y } => {
                let handle = self.targets.tcp.as_ref().ok_or(SequenceError::MissingTarget("tcp"))?;
                info!(x, y, "move TCP to");
                let generation = handle.set_target([x, y]);
                self.wait_reached(handle, generation)
            }
            Step::MoveServoTo { position } => {
                let handle = self.targets.servo.as_ref().ok_or(SequenceError::MissingTarget("servo"))?;
                info!(position, "move servo to");
                let generation = handle.set_setpoint(position);
                self.wait_reached(handle, generation)
            }
            Step::Wait { seconds } => {
                debug!(seconds, "wait");
                let deadline = Duration::try_from_secs_f64(seconds)
                    .ok()
                    .and_then(|d| Instant::now().checked_add(d))
                    .ok_or(SequenceError::InvalidStep(*step))?;
                loop {
                    self.check_running()?;
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    std::thread::sleep(self.poll.min(deadline - now));
                }
            }
        }
    }

    /// Wait for motor power, then execute `steps` once or until stopped.
    pub fn run(&self, steps: &[Step], repeat: bool) -> Result<(), SequenceError> {
        self.wait_for_level(SafetyLevel::MotorPowerOn)?;
        info!(steps = steps.len(), repeat, "sequence started");
        loop {
            for step in steps {
                self.execute(step)?;
            }
            if !repeat {
                info!("sequence complete");
                return Ok(());
            }
        }
    }

    /// Run on a named thread.
    pub fn spawn(self, steps: Vec<Step>, repeat: bool) -> std::io::Result<JoinHandle<Result<(), SequenceError>>> {
        std::thread::Builder::new()
            .name("sequence".into())
            .spawn(move || self.run(&steps, repeat))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::pipeline::{ControlPipeline, ControlSystem};
    use crate::safety::supervisor::SafetySupervisor;
    use diffbot_common::control_unit::config::ControlUnitConfig;
    use diffbot_common::hal::types::DigitalInputs;

    fn system_on() -> (SafetySupervisor, ControlSystem) {
        let cfg = ControlUnitConfig::default();
        let mut sup = SafetySupervisor::new(&cfg.supervisor);
        let mut pipeline = ControlSystem::pose_tracking(&cfg);
        sup.handle().trigger(SafetyEvent::DoSystemOn);
        sup.run(&DigitalInputs::default(), &mut pipeline);
        (sup, pipeline)
    }

    #[test]
    fn parses_sequence_file() {
        let file = parse_sequence(
            r#"
            repeat = true

            [[steps]]
            step = "move_to"
            x = 0.5
            y = 0.0

            [[steps]]
            step = "move_tcp_to"
            x = 0.3
            y = 0.1

            [[steps]]
            step = "move_servo_to"
            position = 0.02

            [[steps]]
            step = "wait"
            seconds = 0.5
            "#,
        )
        .unwrap();
        assert!(file.repeat);
        assert_eq!(
            file.steps,
            vec![
                Step::MoveTo {
                    x: 0.5,
                    y: 0.0,
                    phi: None
                },
                Step::MoveTcpTo { x: 0.3, y: 0.1 },
                Step::MoveServoTo { position: 0.02 },
                Step::Wait { seconds: 0.5 },
            ]
        );
    }

    #[test]
    fn rejects_negative_wait() {
        let err = parse_sequence("steps = [{ step = \"wait\", seconds = -1.0 }]").unwrap_err();
        assert!(matches!(err, SequenceError::InvalidStep(Step::Wait { .. })));
    }

    #[test]
    fn rejects_unrepresentable_wait() {
        let err = parse_sequence("steps = [{ step = \"wait\", seconds = 1e300 }]").unwrap_err();
        assert!(matches!(err, SequenceError::InvalidStep(Step::Wait { .. })));

        let (sup, pipeline) = system_on();
        let seq = Sequencer::new(sup.handle(), pipeline.targets(), Arc::new(AtomicBool::new(true)));
        assert_eq!(
            seq.execute(&Step::Wait { seconds: 1e300 }),
            Err(SequenceError::InvalidStep(Step::Wait { seconds: 1e300 }))
        );
    }

    #[test]
    fn rejects_unknown_step() {
        let err = parse_sequence("steps = [{ step = \"jump\" }]").unwrap_err();
        assert!(matches!(err, SequenceError::Load(_)));
    }

    #[test]
    fn square_path_visits_four_corners() {
        let steps = square_path();
        assert_eq!(steps.len(), 8);
        assert_eq!(
            steps[2],
            Step::MoveTo {
                x: 0.5,
                y: 0.5,
                phi: Some(FRAC_PI_2)
            }
        );
        assert_eq!(steps[7], Step::Wait { seconds: 1.0 });
    }

    #[test]
    fn auto_power_on_raises_power_on() {
        let (sup, pipeline) = system_on();
        let seq = Sequencer::new(sup.handle(), pipeline.targets(), Arc::new(AtomicBool::new(true)))
            .with_auto_power_on(true);
        seq.wait_for_level(SafetyLevel::MotorPowerOn).unwrap();
        assert_eq!(sup.level(), SafetyLevel::MotorPowerOn);
    }

    #[test]
    fn cleared_running_flag_stops_waiting() {
        let (sup, pipeline) = system_on();
        let seq = Sequencer::new(sup.handle(), pipeline.targets(), Arc::new(AtomicBool::new(false)));
        assert_eq!(seq.wait_for_level(SafetyLevel::MotorPowerOn), Err(SequenceError::Stopped));
        assert_eq!(seq.execute(&Step::Wait { seconds: 10.0 }), Err(SequenceError::Stopped));
    }

    #[test]
    fn missing_handle_is_reported() {
        let (sup, pipeline) = system_on();
        let seq = Sequencer::new(sup.handle(), pipeline.targets(), Arc::new(AtomicBool::new(true)));
        assert_eq!(
            seq.execute(&Step::MoveServoTo { position: 0.1 }),
            Err(SequenceError::MissingTarget("servo"))
        );
    }

    #[test]
    fn short_wait_completes() {
        let (sup, pipeline) = system_on();
        let seq = Sequencer::new(sup.handle(), pipeline.targets(), Arc::new(AtomicBool::new(true)));
        let start = Instant::now();
        seq.execute(&Step::Wait { seconds: 0.02 }).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
