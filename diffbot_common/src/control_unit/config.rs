//! Configuration structures for the Control Unit.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every field
//! has a default, so an empty file yields the reference robot.
//! Semantic checks live in the per-section `validate()` methods and are
//! chained by [`ControlUnitConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_CYCLE_TIME_US, MIN_CYCLE_TIME_US};
use crate::hal::config::{HalConfig, MotorConfig};
use crate::motion::Pose;

use super::control::ControllerConfig;
use super::state::PipelineVariant;

// ─── Defaults ───────────────────────────────────────────────────────

/// Distance between the wheel contact points B [m].
pub const WHEEL_SEPARATION_DEFAULT: f64 = 0.15;
/// Distance from the axle midpoint to the TCP L [m].
pub const TCP_LEVER_ARM_DEFAULT: f64 = 0.17;
/// Velocity controller damping D.
pub const VELOCITY_DAMPING_DEFAULT: f64 = 0.7;
/// Velocity controller safety factor s.
pub const VELOCITY_SAFETY_FACTOR_DEFAULT: f64 = 2.2;
/// Velocity integrator clamp [m].
pub const INTEGRATOR_LIMIT_DEFAULT: f64 = 0.1;
/// Servo position controller safety factor s.
pub const SERVO_SAFETY_FACTOR_DEFAULT: f64 = 4.6;
/// Servo force clamp [N].
pub const SERVO_MAX_FORCE_DEFAULT: f64 = 0.1;
/// Planner gains.
pub const PLANNER_K1_DEFAULT: f64 = 0.5;
/// Planner heading gain.
pub const PLANNER_K2_DEFAULT: f64 = 1.0;
/// Planner orientation gain.
pub const PLANNER_K3_DEFAULT: f64 = 1.0;
/// Position reached tolerance [m].
pub const POSITION_TOLERANCE_DEFAULT: f64 = 1e-3;
/// Linearisation threshold for the bearing angle [rad].
pub const ROTATION_TOLERANCE_DEFAULT: f64 = 1e-3;
/// TCP position loop frequency [Hz].
pub const TCP_FREQUENCY_DEFAULT: f64 = 10.0;
/// TCP speed limit [m/s].
pub const TCP_MAX_VELOCITY_DEFAULT: f64 = 0.1;
/// Velocity error below which the wheels count as halted [m/s].
pub const SMALL_ERROR_DEFAULT: f64 = 1e-3;
/// Velocity error above which the robot counts as moving [m/s].
pub const LARGE_ERROR_DEFAULT: f64 = 0.1;

/// Task frequency matching the default cycle time [Hz].
fn default_task_frequency() -> f64 {
    1e6 / DEFAULT_CYCLE_TIME_US as f64
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Top-level Control Unit configuration (`diffbot.toml`).
///
/// Loaded from TOML at startup, immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlUnitConfig {
    /// Service name and log level.
    pub shared: SharedConfig,
    /// Cycle time and pipeline variant.
    pub cycle: CycleConfig,
    /// Robot geometry.
    pub robot: RobotConfig,
    /// Drive train.
    pub motor: MotorConfig,
    /// Wheel velocity controllers.
    pub controller: VelocityControllerConfig,
    /// Pose-tracking planner.
    pub planner: PlannerConfig,
    /// TCP position controller.
    pub tcp: TcpConfig,
    /// Per-joint Kalman estimator.
    pub estimator: EstimatorConfig,
    /// Safety supervisor thresholds and input polarity.
    pub supervisor: SupervisorConfig,
    /// Servo variant.
    pub servo: ServoConfig,
    /// HAL driver selection.
    pub hal: HalConfig,
}

impl ControlUnitConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.shared.validate().map_err(|e| e.to_string())?;
        self.cycle.validate()?;
        self.robot.validate(self.cycle.variant)?;
        self.motor.validate()?;
        self.controller.validate()?;
        self.planner.validate()?;
        self.tcp.validate()?;
        self.estimator.validate()?;
        self.supervisor.validate()?;
        self.servo.validate()?;
        self.hal.validate()?;
        Ok(())
    }
}

// ─── Sections ───────────────────────────────────────────────────────

/// `[cycle]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Cycle time [µs] (default: 5000 = 5 ms).
    pub cycle_time_us: u32,
    /// Pipeline variant to build.
    pub variant: PipelineVariant,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            variant: PipelineVariant::default(),
        }
    }
}

impl CycleConfig {
    /// Cycle period [s].
    #[inline]
    pub fn dt(&self) -> f64 {
        self.cycle_time_us as f64 * 1e-6
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_time_us < MIN_CYCLE_TIME_US || self.cycle_time_us > MAX_CYCLE_TIME_US {
            return Err(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, MIN_CYCLE_TIME_US, MAX_CYCLE_TIME_US
            ));
        }
        Ok(())
    }
}

/// `[robot]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Wheel separation B [m].
    pub wheel_separation: f64,
    /// TCP lever arm L [m].
    pub tcp_lever_arm: f64,
    /// Pose the odometry is reset to on start-up.
    pub initial_pose: Pose,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            wheel_separation: WHEEL_SEPARATION_DEFAULT,
            tcp_lever_arm: TCP_LEVER_ARM_DEFAULT,
            initial_pose: Pose::default(),
        }
    }
}

impl RobotConfig {
    /// Validate geometry. A zero lever arm is only rejected for the TCP variant.
    pub fn validate(&self, variant: PipelineVariant) -> Result<(), String> {
        if !(self.wheel_separation.is_finite() && self.wheel_separation > 0.0) {
            return Err(format!(
                "robot.wheel_separation must be > 0, got {}",
                self.wheel_separation
            ));
        }
        if variant == PipelineVariant::Tcp
            && !(self.tcp_lever_arm.is_finite() && self.tcp_lever_arm > 0.0)
        {
            return Err(format!(
                "robot.tcp_lever_arm must be > 0 for the tcp variant, got {}",
                self.tcp_lever_arm
            ));
        }
        let p = &self.initial_pose;
        if !(p.x.is_finite() && p.y.is_finite() && p.phi.is_finite()) {
            return Err("robot.initial_pose must be finite".to_string());
        }
        Ok(())
    }
}

/// `[controller]` section: the two wheel velocity loops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityControllerConfig {
    /// Gain parameterisation.
    pub gains: ControllerConfig,
    /// Integrator clamp e_limit [m].
    pub integrator_limit: f64,
    /// Whether the integrator clamp is active.
    pub limit_enabled: bool,
}

impl Default for VelocityControllerConfig {
    fn default() -> Self {
        Self {
            gains: ControllerConfig::FromTaskFrequency {
                task_frequency: default_task_frequency(),
                damping: VELOCITY_DAMPING_DEFAULT,
                safety_factor: VELOCITY_SAFETY_FACTOR_DEFAULT,
                inertia: MotorConfig::default().reflected_inertia(),
            },
            integrator_limit: INTEGRATOR_LIMIT_DEFAULT,
            limit_enabled: true,
        }
    }
}

impl VelocityControllerConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        self.gains.validate()?;
        if !(self.integrator_limit.is_finite() && self.integrator_limit > 0.0) {
            return Err(format!(
                "controller.integrator_limit must be > 0, got {}",
                self.integrator_limit
            ));
        }
        Ok(())
    }
}

/// `[planner]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Distance gain k1.
    pub k1: f64,
    /// Bearing gain k2.
    pub k2: f64,
    /// Orientation gain k3.
    pub k3: f64,
    /// Reached when the distance to the target is at most this [m].
    pub position_tolerance: f64,
    /// Linearised branch when |γ| is at most this [rad].
    pub rotation_tolerance: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            k1: PLANNER_K1_DEFAULT,
            k2: PLANNER_K2_DEFAULT,
            k3: PLANNER_K3_DEFAULT,
            position_tolerance: POSITION_TOLERANCE_DEFAULT,
            rotation_tolerance: ROTATION_TOLERANCE_DEFAULT,
        }
    }
}

impl PlannerConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("k1", self.k1),
            ("k2", self.k2),
            ("k3", self.k3),
            ("position_tolerance", self.position_tolerance),
            ("rotation_tolerance", self.rotation_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("planner.{name} must be > 0, got {value}"));
            }
        }
        Ok(())
    }
}

/// `[tcp]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Position loop frequency [Hz].
    pub frequency: f64,
    /// Damping ratio.
    pub damping: f64,
    /// Speed limit [m/s].
    pub max_velocity: f64,
    /// Reached when the position error is below this [m].
    pub tolerance: f64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            frequency: TCP_FREQUENCY_DEFAULT,
            damping: VELOCITY_DAMPING_DEFAULT,
            max_velocity: TCP_MAX_VELOCITY_DEFAULT,
            tolerance: POSITION_TOLERANCE_DEFAULT,
        }
    }
}

impl TcpConfig {
    /// Proportional gain K = f / 3.2 / (2·D) [1/s].
    #[inline]
    pub fn gain(&self) -> f64 {
        self.frequency / 3.2 / 2.0 / self.damping
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("frequency", self.frequency),
            ("damping", self.damping),
            ("max_velocity", self.max_velocity),
            ("tolerance", self.tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("tcp.{name} must be > 0, got {value}"));
            }
        }
        Ok(())
    }
}

/// `[estimator]` section.
///
/// Matrices are row-major. The defaults describe the reference drive
/// discretised at 1 ms; enable the estimator together with
/// `cycle_time_us = 1000` or supply matrices for the configured period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Replace differentiated encoder velocity with the Kalman estimate.
    pub enabled: bool,
    /// Discrete transition matrix Ad.
    pub transition: [[f64; 4]; 4],
    /// Discrete input vector Bd (voltage).
    pub input: [f64; 4],
    /// Measurement row C.
    pub output: [f64; 4],
    /// Process noise input vector Gd.
    pub noise_input: [f64; 4],
    /// Process noise variance Q.
    pub process_noise: f64,
    /// Measurement noise variance R.
    pub measurement_noise: f64,
    /// Initial covariance diagonal.
    pub initial_covariance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transition: [
                [
                    1.0,
                    9.901294350681072e-4,
                    1.187647358725703e-6,
                    -4.950647175340536e-7,
                ],
                [
                    0.0,
                    0.980258870136214,
                    0.002375294717451,
                    -9.901294350681072e-4,
                ],
                [
                    0.0,
                    -1.563880235077955,
                    -0.811830605100179,
                    7.819401175389773e-4,
                ],
                [0.0, 0.0, 0.0, 1.0],
            ],
            input: [
                1.413865903244885e-6,
                0.002827731806490,
                0.224011184404549,
                0.0,
            ],
            output: [1.0, 0.0, 0.0, 0.0],
            noise_input: [
                -4.950647175340536e-7,
                -9.901294350681072e-4,
                7.819401175389773e-4,
                1.0,
            ],
            process_noise: 2.777777777777778e-8,
            measurement_noise: 1.173912855809449e-9,
            initial_covariance: 1e-6,
        }
    }
}

impl EstimatorConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        let all_finite = self.transition.iter().flatten().all(|v| v.is_finite())
            && self.input.iter().all(|v| v.is_finite())
            && self.output.iter().all(|v| v.is_finite())
            && self.noise_input.iter().all(|v| v.is_finite());
        if !all_finite {
            return Err("estimator matrices must be finite".to_string());
        }
        if self.output.iter().all(|v| *v == 0.0) {
            return Err("estimator.output must not be all zeros".to_string());
        }
        if !(self.measurement_noise.is_finite() && self.measurement_noise > 0.0) {
            return Err(format!(
                "estimator.measurement_noise must be > 0 (innovation would be singular), got {}",
                self.measurement_noise
            ));
        }
        if !(self.process_noise.is_finite() && self.process_noise >= 0.0) {
            return Err(format!(
                "estimator.process_noise must be >= 0, got {}",
                self.process_noise
            ));
        }
        if !(self.initial_covariance.is_finite() && self.initial_covariance >= 0.0) {
            return Err(format!(
                "estimator.initial_covariance must be >= 0, got {}",
                self.initial_covariance
            ));
        }
        Ok(())
    }
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Wheels count as halted when both velocity errors are below this [m/s].
    pub small_error: f64,
    /// Robot counts as moving when either velocity error exceeds this [m/s].
    pub large_error: f64,
    /// Expected mode-button state while in Emergency; any other state raises ResetEmergency.
    pub reset_emergency_expected: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            small_error: SMALL_ERROR_DEFAULT,
            large_error: LARGE_ERROR_DEFAULT,
            reset_emergency_expected: true,
        }
    }
}

impl SupervisorConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.small_error.is_finite() && self.small_error > 0.0) {
            return Err(format!(
                "supervisor.small_error must be > 0, got {}",
                self.small_error
            ));
        }
        if !(self.large_error.is_finite() && self.large_error > self.small_error) {
            return Err(format!(
                "supervisor.large_error must be > small_error ({}), got {}",
                self.small_error, self.large_error
            ));
        }
        Ok(())
    }
}

/// `[servo]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Position PD gain parameterisation.
    pub gains: ControllerConfig,
    /// Force clamp for the servo joint [N].
    pub max_force: f64,
    /// Setpoint before the first `MoveServoTo` [m].
    pub initial_setpoint: f64,
    /// Setpoint counts as reached when the position error is at most this [m].
    pub tolerance: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            gains: ControllerConfig::FromTaskFrequency {
                task_frequency: default_task_frequency(),
                damping: VELOCITY_DAMPING_DEFAULT,
                safety_factor: SERVO_SAFETY_FACTOR_DEFAULT,
                inertia: MotorConfig::default().reflected_inertia(),
            },
            max_force: SERVO_MAX_FORCE_DEFAULT,
            initial_setpoint: 0.0,
            tolerance: POSITION_TOLERANCE_DEFAULT,
        }
    }
}

impl ServoConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        self.gains.validate()?;
        if !(self.max_force.is_finite() && self.max_force > 0.0) {
            return Err(format!("servo.max_force must be > 0, got {}", self.max_force));
        }
        if !self.initial_setpoint.is_finite() {
            return Err("servo.initial_setpoint must be finite".to_string());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(format!("servo.tolerance must be > 0, got {}", self.tolerance));
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn empty_document_yields_reference_robot() {
        let cfg = ControlUnitConfig::from_toml_str("").unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cycle.cycle_time_us, 5_000);
        assert!((cfg.cycle.dt() - 0.005).abs() < 1e-15);
        assert_eq!(cfg.robot.wheel_separation, 0.15);
        assert_eq!(cfg.planner.k1, 0.5);
        assert!(!cfg.estimator.enabled);
        assert!(cfg.supervisor.reset_emergency_expected);
        assert_eq!(cfg.controller.gains.natural_frequency(), 200.0 / (2.0 * 2.2 * 0.7));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = ControlUnitConfig::from_toml_str(
            "[cycle]\nvariant = \"tcp\"\n\n[planner]\nk1 = 0.8\n",
        )
        .unwrap();
        assert_eq!(cfg.cycle.variant, PipelineVariant::Tcp);
        assert_eq!(cfg.cycle.cycle_time_us, 5_000);
        assert_eq!(cfg.planner.k1, 0.8);
        assert_eq!(cfg.planner.k2, 1.0);
    }

    #[test]
    fn cycle_time_bounds() {
        let mut c = CycleConfig::default();
        c.cycle_time_us = 10;
        assert!(c.validate().is_err());
        c.cycle_time_us = 1_000;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_lever_arm_only_rejected_for_tcp() {
        let robot = RobotConfig {
            tcp_lever_arm: 0.0,
            ..Default::default()
        };
        assert!(robot.validate(PipelineVariant::Pose).is_ok());
        assert!(robot.validate(PipelineVariant::Tcp).is_err());
    }

    #[test]
    fn zero_measurement_noise_rejected() {
        let est = EstimatorConfig {
            measurement_noise: 0.0,
            ..Default::default()
        };
        assert!(est.validate().unwrap_err().contains("singular"));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let sup = SupervisorConfig {
            small_error: 0.2,
            large_error: 0.1,
            ..Default::default()
        };
        assert!(sup.validate().is_err());
    }

    #[test]
    fn tcp_gain_from_frequency() {
        let tcp = TcpConfig::default();
        assert!((tcp.gain() - 10.0 / 3.2 / 1.4).abs() < 1e-12);
    }
}
