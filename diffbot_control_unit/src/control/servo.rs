//! Single-joint position servo on wheel channel 0.
//!
//! setpoint → position PD → inverse motor model → voltage. While guidance
//! is disabled the servo holds the position it had when guidance went off.
//! The supervisor sees the joint velocity as the velocity error.

use std::sync::Arc;

use diffbot_common::consts::{LEFT, WHEEL_COUNT};
use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::error::FaultFlags;
use diffbot_common::hal::types::HalStatus;

use crate::safety::supervisor::SupervisedPipeline;

use super::controller::PositionController;
use super::estimator::KalmanEstimator;
use super::motor_model::MotorModel;
use super::pipeline::{ControlPipeline, EncoderDifferentiator, MotionTargets};
use super::target::{ServoHandle, TargetHandle, TargetSlot};

/// Servo pipeline.
#[derive(Debug)]
pub struct ServoControlSystem {
    controller: PositionController,
    motor: MotorModel,
    estimator: Option<KalmanEstimator>,
    differentiator: EncoderDifferentiator<1>,
    slot: Arc<TargetSlot<f64>>,
    tolerance: f64,
    guidance_enabled: bool,
    hold: Option<f64>,
    running: bool,
    position: f64,
    velocity: f64,
    faults: FaultFlags,
}

impl ServoControlSystem {
    /// Build from the `[servo]`, `[motor]` and `[estimator]` sections.
    pub fn new(config: &ControlUnitConfig) -> Self {
        Self {
            controller: PositionController::new(&config.servo.gains),
            motor: MotorModel::with_force_limit(&config.motor, config.servo.max_force),
            estimator: config
                .estimator
                .enabled
                .then(|| KalmanEstimator::new(&config.estimator)),
            differentiator: EncoderDifferentiator::new(),
            slot: Arc::new(TargetSlot::new(config.servo.initial_setpoint)),
            tolerance: config.servo.tolerance,
            guidance_enabled: false,
            hold: None,
            running: false,
            position: 0.0,
            velocity: 0.0,
            faults: FaultFlags::empty(),
        }
    }

    /// Sequencer handle for the setpoint.
    pub fn handle(&self) -> ServoHandle {
        TargetHandle::new(Arc::clone(&self.slot))
    }

    /// Joint position of the last cycle [m].
    #[inline]
    pub const fn position(&self) -> f64 {
        self.position
    }

    /// Joint velocity of the last cycle [m/s].
    #[inline]
    pub const fn velocity(&self) -> f64 {
        self.velocity
    }
}

impl SupervisedPipeline for ServoControlSystem {
    fn set_odometry_enabled(&mut self, _enabled: bool) {}

    fn set_controller_enabled(&mut self, enabled: bool) {
        if self.controller.is_enabled() != enabled {
            self.controller.set_enabled(enabled);
        }
    }

    fn set_guidance_enabled(&mut self, enabled: bool) {
        self.guidance_enabled = enabled;
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn reset_pose(&mut self) {
        self.hold = None;
    }

    fn velocity_errors(&self) -> [f64; WHEEL_COUNT] {
        [self.velocity, 0.0]
    }
}

impl ControlPipeline for ServoControlSystem {
    fn run(&mut self, status: &HalStatus, dt: f64) -> [f64; WHEEL_COUNT] {
        self.faults = FaultFlags::empty();
        if !self.running {
            self.differentiator.reset();
            self.velocity = 0.0;
            return [0.0; WHEEL_COUNT];
        }

        let measured = status.encoders[LEFT];
        let (position, velocity) = match &mut self.estimator {
            Some(est) => {
                let e = est.correct(measured);
                if e.reset {
                    self.faults |= FaultFlags::ESTIMATOR_RESET;
                }
                (measured, e.velocity)
            }
            None => (measured, self.differentiator.update([measured], dt)[0]),
        };
        self.position = position;
        self.velocity = velocity;

        let setpoint = if self.guidance_enabled {
            self.hold = None;
            let snapshot = self.slot.snapshot();
            if !snapshot.reached && (snapshot.target - position).abs() <= self.tolerance {
                self.slot.mark_reached(snapshot.generation);
            }
            snapshot.target
        } else {
            *self.hold.get_or_insert(position)
        };

        let out = self.controller.run(setpoint, position, velocity, dt);
        let cmd = self.motor.voltage(out.torque, out.velocity);
        self.faults |= cmd.flags;
        let voltage = if cmd.voltage.is_finite() {
            cmd.voltage
        } else {
            self.faults |= FaultFlags::NON_FINITE_OUTPUT;
            0.0
        };

        if let Some(est) = &mut self.estimator {
            est.predict(voltage);
        }

        let mut voltages = [0.0; WHEEL_COUNT];
        voltages[LEFT] = voltage;
        voltages
    }

    fn faults(&self) -> FaultFlags {
        self.faults
    }

    fn targets(&self) -> MotionTargets {
        MotionTargets {
            servo: Some(self.handle()),
            ..Default::default()
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
