//! Safety supervisor.
//!
//! Executes the tables in [`super::levels`] once per cycle, before the
//! control pipeline. The current level is shared with [`SupervisorHandle`]
//! so the sequencer and the signal handler can read it and raise public
//! events from other threads.
//!
//! Events switch the level immediately, under the lock. A cycle snapshots
//! the level when it starts and runs input, level and output actions for
//! that snapshot; the new level's actions begin with the next cycle.

use std::sync::Arc;

use diffbot_common::consts::WHEEL_COUNT;
use diffbot_common::control_unit::config::SupervisorConfig;
use diffbot_common::control_unit::state::{SafetyEvent, SafetyLevel, Visibility};
use diffbot_common::hal::types::{DigitalInputs, DigitalOutputs};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::levels::{self, InputAction, OutputAction};

/// Stage switches and status the supervisor needs from a pipeline.
pub trait SupervisedPipeline {
    /// Enable or disable odometry integration.
    fn set_odometry_enabled(&mut self, enabled: bool);
    /// Enable or disable the velocity (or position) controllers.
    fn set_controller_enabled(&mut self, enabled: bool);
    /// Enable or disable guidance (planner, TCP controller or servo setpoint).
    fn set_guidance_enabled(&mut self, enabled: bool);
    /// Start producing voltages.
    fn start(&mut self);
    /// Stop producing voltages; output is zero until the next `start`.
    fn stop(&mut self);
    /// Return the pose estimate to the configured initial pose.
    fn reset_pose(&mut self);
    /// Per-wheel velocity error used for the halted/moving thresholds.
    fn velocity_errors(&self) -> [f64; WHEEL_COUNT];
}

/// Result of raising an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition taken, new level.
    Ok(SafetyLevel),
    /// Event ignored, reason.
    Rejected(&'static str),
}

#[derive(Debug)]
struct SharedState {
    level: SafetyLevel,
    stop_requested: bool,
}

fn raise(shared: &Mutex<SharedState>, event: SafetyEvent) -> TransitionResult {
    let mut state = shared.lock();
    let from = state.level;
    match levels::transition(from, event) {
        Some(to) => {
            state.level = to;
            if from == SafetyLevel::SystemOff {
                state.stop_requested = false;
            }
            drop(state);
            info!(?from, ?event, ?to, "{}", to.description());
            TransitionResult::Ok(to)
        }
        None => {
            drop(state);
            debug!(level = ?from, ?event, "event rejected");
            TransitionResult::Rejected("no transition for this event in the current level")
        }
    }
}

/// Thread-safe view of the supervisor for the sequencer and signal handler.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    shared: Arc<Mutex<SharedState>>,
}

impl SupervisorHandle {
    /// Current level.
    pub fn level(&self) -> SafetyLevel {
        self.shared.lock().level
    }

    /// Raise a public event. Private events are rejected.
    pub fn trigger(&self, event: SafetyEvent) -> TransitionResult {
        if event.visibility() == Visibility::Private {
            debug!(?event, "private event raised through the public API");
            return TransitionResult::Rejected("event is private to the supervisor");
        }
        raise(&self.shared, event)
    }

    /// Abort: brake if moving, then shut down.
    pub fn exit(&self) -> TransitionResult {
        self.trigger(SafetyEvent::Abort)
    }

    /// True once the supervisor has reached `SystemOff` and asks the executor to stop.
    pub fn stop_requested(&self) -> bool {
        self.shared.lock().stop_requested
    }
}

/// Safety FSM driving a [`SupervisedPipeline`].
#[derive(Debug)]
pub struct SafetySupervisor {
    shared: Arc<Mutex<SharedState>>,
    config: SupervisorConfig,
    outputs: DigitalOutputs,
    last_level: Option<SafetyLevel>,
}

impl SafetySupervisor {
    /// New supervisor in `SystemOff`, LEDs dark.
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SharedState {
                level: SafetyLevel::SystemOff,
                stop_requested: false,
            })),
            config: *config,
            outputs: DigitalOutputs::default(),
            last_level: None,
        }
    }

    /// Handle sharing this supervisor's level.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current level.
    pub fn level(&self) -> SafetyLevel {
        self.shared.lock().level
    }

    /// LED states after the last cycle.
    #[inline]
    pub const fn outputs(&self) -> DigitalOutputs {
        self.outputs
    }

    /// One supervisor cycle. Returns the LED states to send to the HAL.
    pub fn run<P: SupervisedPipeline + ?Sized>(
        &mut self,
        inputs: &DigitalInputs,
        pipeline: &mut P,
    ) -> DigitalOutputs {
        let level = self.level();
        let entered = self.last_level != Some(level);
        self.last_level = Some(level);

        for (input, action) in levels::input_actions(level, self.config.reset_emergency_expected) {
            if let InputAction::Check { expected, event } = action {
                if inputs.get(input) != expected {
                    raise(&self.shared, event);
                }
            }
        }

        self.level_action(level, entered, pipeline);

        for (output, action) in levels::output_actions(level) {
            let value = match action {
                OutputAction::Set(v) => v,
                OutputAction::Toggle => !self.outputs.get(output),
            };
            self.outputs.set(output, value);
        }
        self.outputs
    }

    fn level_action<P: SupervisedPipeline + ?Sized>(
        &mut self,
        level: SafetyLevel,
        entered: bool,
        pipeline: &mut P,
    ) {
        use SafetyLevel as L;

        match level {
            L::SystemOff => {
                self.shared.lock().stop_requested = true;
            }
            L::ShuttingDown => {
                set_stages(pipeline, false, false, false);
                pipeline.stop();
                raise(&self.shared, SafetyEvent::Shutdown);
            }
            L::Braking | L::EmergencyBraking => {
                set_stages(pipeline, true, true, false);
                if self.halted(pipeline) {
                    raise(&self.shared, SafetyEvent::MotorsHalted);
                }
            }
            L::StartingUp => {
                if entered {
                    pipeline.reset_pose();
                }
                set_stages(pipeline, true, true, false);
                pipeline.start();
                raise(&self.shared, SafetyEvent::SystemStarted);
            }
            L::Emergency | L::SystemOn => {
                set_stages(pipeline, true, true, false);
            }
            L::MotorPowerOn => {
                set_stages(pipeline, true, true, true);
                let e = pipeline.velocity_errors();
                if e.iter().any(|v| v.abs() > self.config.large_error) {
                    raise(&self.shared, SafetyEvent::StartMoving);
                }
            }
            L::SystemMoving => {
                set_stages(pipeline, true, true, true);
                if self.halted(pipeline) {
                    raise(&self.shared, SafetyEvent::StopMoving);
                }
            }
        }
    }

    fn halted<P: SupervisedPipeline + ?Sized>(&self, pipeline: &P) -> bool {
        pipeline
            .velocity_errors()
            .iter()
            .all(|v| v.abs() < self.config.small_error)
    }
}

fn set_stages<P: SupervisedPipeline + ?Sized>(
    pipeline: &mut P,
    odometry: bool,
    controller: bool,
    guidance: bool,
) {
    pipeline.set_odometry_enabled(odometry);
    pipeline.set_controller_enabled(controller);
    pipeline.set_guidance_enabled(guidance);
}

// ─── Tests ──────────────────────────────────────────────────────────
