//! Two-wheel control pipeline.
//!
//! Fixed stage order per cycle:
//!
//! ```text
//! encoders → [estimator correct | differencing] → odometry → guidance
//!          → inverse kinematics → velocity PI ×2 → inverse motor model
//!          → [estimator predict] → voltages
//! ```
//!
//! Guidance is either the pose-tracking planner (tracked point = axle
//! midpoint) or the TCP position controller (tracked point = TCP at lever
//! arm L). The safety supervisor toggles the stages through
//! [`SupervisedPipeline`].

use diffbot_common::consts::WHEEL_COUNT;
use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::error::FaultFlags;
use diffbot_common::hal::types::HalStatus;
use diffbot_common::motion::{Pose, Stamped, TargetPose, WheelVelocityPair};
use tracing::debug;

use crate::safety::supervisor::SupervisedPipeline;

use super::controller::VelocityController;
use super::estimator::KalmanEstimator;
use super::kinematics::Kinematics;
use super::motor_model::MotorModel;
use super::odometry::Odometry;
use super::planner::Planner;
use super::target::{PlannerHandle, ServoHandle, TcpTargetHandle};
use super::tcp::TcpController;

/// Sequencer-side handles exposed by a pipeline.
#[derive(Debug, Clone, Default)]
pub struct MotionTargets {
    /// Pose-tracking planner target.
    pub planner: Option<PlannerHandle>,
    /// TCP position target.
    pub tcp: Option<TcpTargetHandle>,
    /// Servo setpoint.
    pub servo: Option<ServoHandle>,
}

/// A pipeline the cycle runner can drive.
pub trait ControlPipeline: SupervisedPipeline {
    /// Run one cycle on a fresh HAL sample and return the motor voltages.
    fn run(&mut self, status: &HalStatus, dt: f64) -> [f64; WHEEL_COUNT];

    /// Diagnostic and critical flags raised during the last `run`.
    fn faults(&self) -> FaultFlags;

    /// Handles for the sequencer.
    fn targets(&self) -> MotionTargets;
}

/// Encoder position differencing. The first sample after a reset yields zero.
#[derive(Debug, Clone, Default)]
pub struct EncoderDifferentiator<const N: usize> {
    previous: Option<[f64; N]>,
}

impl<const N: usize> EncoderDifferentiator<N> {
    /// Empty differentiator.
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Forget the previous sample.
    #[inline]
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Velocity from the change since the last sample.
    #[inline]
    pub fn update(&mut self, positions: [f64; N], dt: f64) -> [f64; N] {
        let mut velocities = [0.0; N];
        if let Some(prev) = self.previous {
            if dt > 0.0 {
                for i in 0..N {
                    velocities[i] = (positions[i] - prev[i]) / dt;
                }
            }
        }
        self.previous = Some(positions);
        velocities
    }
}

/// Guidance stage of the two-wheel pipeline.
#[derive(Debug)]
pub enum Guidance {
    /// Lyapunov pose tracking of the axle midpoint.
    PoseTracking(Planner),
    /// Proportional TCP position control.
    TcpPosition(TcpController),
}

/// Two-wheel differential-drive pipeline.
#[derive(Debug)]
pub struct ControlSystem {
    kinematics: Kinematics,
    odometry: Odometry,
    guidance: Guidance,
    controllers: [VelocityController; WHEEL_COUNT],
    motor: MotorModel,
    estimators: Option<[KalmanEstimator; WHEEL_COUNT]>,
    differentiator: EncoderDifferentiator<WHEEL_COUNT>,
    initial_pose: Pose,
    running: bool,
    velocity_errors: [f64; WHEEL_COUNT],
    reference: WheelVelocityPair,
    faults: FaultFlags,
}

impl ControlSystem {
    /// Pose-tracking pipeline: odometry of the axle midpoint + planner.
    pub fn pose_tracking(config: &ControlUnitConfig) -> Self {
        let initial = config.robot.initial_pose;
        let planner = Planner::new(config.planner, TargetPose::position(initial.x, initial.y));
        Self::build(config, 0.0, Guidance::PoseTracking(planner))
    }

    /// TCP pipeline: odometry of the TCP (lever arm L) + TCP position controller.
    pub fn tcp(config: &ControlUnitConfig) -> Self {
        let initial = config.robot.initial_pose;
        let tcp = TcpController::new(&config.tcp, [initial.x, initial.y]);
        Self::build(config, config.robot.tcp_lever_arm, Guidance::TcpPosition(tcp))
    }

    fn build(config: &ControlUnitConfig, lever_arm: f64, guidance: Guidance) -> Self {
        let kinematics = Kinematics::new(config.robot.wheel_separation, lever_arm);
        let estimators = config.estimator.enabled.then(|| {
            [
                KalmanEstimator::new(&config.estimator),
                KalmanEstimator::new(&config.estimator),
            ]
        });
        Self {
            kinematics,
            odometry: Odometry::new(kinematics, config.robot.initial_pose),
            guidance,
            controllers: [
                VelocityController::new(&config.controller),
                VelocityController::new(&config.controller),
            ],
            motor: MotorModel::new(&config.motor),
            estimators,
            differentiator: EncoderDifferentiator::new(),
            initial_pose: config.robot.initial_pose,
            running: false,
            velocity_errors: [0.0; WHEEL_COUNT],
            reference: WheelVelocityPair::default(),
            faults: FaultFlags::empty(),
        }
    }

    /// Tracked point pose from odometry.
    #[inline]
    pub fn pose(&self) -> Pose {
        self.odometry.pose()
    }

    /// Wheel velocity references of the last cycle.
    #[inline]
    pub fn reference(&self) -> WheelVelocityPair {
        self.reference
    }

    /// Whether the pipeline is started.
    #[inline]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Planner handle, if this is the pose-tracking pipeline.
    pub fn planner_handle(&self) -> Option<PlannerHandle> {
        match &self.guidance {
            Guidance::PoseTracking(p) => Some(p.handle()),
            Guidance::TcpPosition(_) => None,
        }
    }

    /// TCP target handle, if this is the TCP pipeline.
    pub fn tcp_handle(&self) -> Option<TcpTargetHandle> {
        match &self.guidance {
            Guidance::TcpPosition(t) => Some(t.handle()),
            Guidance::PoseTracking(_) => None,
        }
    }

    fn measure_velocities(&mut self, encoders: [f64; WHEEL_COUNT], dt: f64) -> [f64; WHEEL_COUNT] {
        match &mut self.estimators {
            Some(estimators) => {
                let mut velocities = [0.0; WHEEL_COUNT];
                for (i, est) in estimators.iter_mut().enumerate() {
                    let estimate = est.correct(encoders[i]);
                    if estimate.reset {
                        self.faults |= FaultFlags::ESTIMATOR_RESET;
                    }
                    velocities[i] = estimate.velocity;
                }
                velocities
            }
            None => self.differentiator.update(encoders, dt),
        }
    }
}

impl SupervisedPipeline for ControlSystem {
    fn set_odometry_enabled(&mut self, enabled: bool) {
        if enabled {
            self.odometry.enable();
        } else {
            self.odometry.disable();
        }
    }

    fn set_controller_enabled(&mut self, enabled: bool) {
        for c in &mut self.controllers {
            if c.is_enabled() != enabled {
                c.set_enabled(enabled);
            }
        }
    }

    fn set_guidance_enabled(&mut self, enabled: bool) {
        match &mut self.guidance {
            Guidance::PoseTracking(p) => p.set_enabled(enabled),
            Guidance::TcpPosition(t) => t.set_enabled(enabled),
        }
    }

    fn start(&mut self) {
        if !self.running {
            debug!("Control pipeline started");
        }
        self.running = true;
    }

    fn stop(&mut self) {
        if self.running {
            debug!("Control pipeline stopped");
        }
        self.running = false;
    }

    fn reset_pose(&mut self) {
        self.odometry.set_pose(self.initial_pose);
    }

    fn velocity_errors(&self) -> [f64; WHEEL_COUNT] {
        self.velocity_errors
    }
}

impl ControlPipeline for ControlSystem {
    fn run(&mut self, status: &HalStatus, dt: f64) -> [f64; WHEEL_COUNT] {
        self.faults = FaultFlags::empty();
        if !self.running {
            self.differentiator.reset();
            self.velocity_errors = [0.0; WHEEL_COUNT];
            self.reference = WheelVelocityPair::default();
            return [0.0; WHEEL_COUNT];
        }

        let timestamp = status.timestamp_ns;
        let measured = self.measure_velocities(status.encoders, dt);
        let odometry = self
            .odometry
            .update(Stamped::new(WheelVelocityPair::from_array(measured), timestamp), dt);

        let reference = match &mut self.guidance {
            Guidance::PoseTracking(planner) => {
                let twist = planner.run(odometry.map(|o| o.pose));
                self.kinematics.inverse(twist.value)
            }
            Guidance::TcpPosition(tcp) => {
                let pose = odometry.value.pose;
                let velocity = tcp.run(Stamped::new([pose.x, pose.y], timestamp));
                self.kinematics.inverse_tcp(velocity.value, pose.phi)
            }
        };
        self.reference = reference;

        let reference = reference.to_array();
        let mut voltages = [0.0; WHEEL_COUNT];
        for i in 0..WHEEL_COUNT {
            let out = self.controllers[i].run(reference[i], measured[i], dt);
            self.velocity_errors[i] = out.error;

            let cmd = self.motor.voltage(out.torque, out.velocity);
            self.faults |= cmd.flags;
            voltages[i] = if cmd.voltage.is_finite() {
                cmd.voltage
            } else {
                self.faults |= FaultFlags::NON_FINITE_OUTPUT;
                0.0
            };
        }

        if let Some(estimators) = &mut self.estimators {
            for (est, u) in estimators.iter_mut().zip(voltages) {
                est.predict(u);
            }
        }

        voltages
    }

    fn faults(&self) -> FaultFlags {
        self.faults
    }

    fn targets(&self) -> MotionTargets {
        MotionTargets {
            planner: self.planner_handle(),
            tcp: self.tcp_handle(),
            servo: None,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
