//! Dead-reckoning odometry.
//!
//! Integrates the yaw rate into the heading first, then rotates the body
//! velocity of the tracked point by the *updated* heading and integrates
//! position. With a zero lever arm the tracked point is the wheel-axis
//! midpoint, otherwise it is the TCP.

use diffbot_common::motion::{Pose, Stamped, WheelVelocityPair, normalize_angle};
use nalgebra::{Rotation2, Vector2};

use super::kinematics::Kinematics;

/// Odometry output for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OdometryState {
    /// Tracked point position and heading.
    pub pose: Pose,
    /// Tracked point velocity in the world frame [m/s].
    pub velocity: [f64; 2],
    /// Yaw rate [rad/s].
    pub omega: f64,
}

/// Pose integrator.
#[derive(Debug, Clone)]
pub struct Odometry {
    kinematics: Kinematics,
    state: OdometryState,
    enabled: bool,
}

impl Odometry {
    /// Create an odometry starting at `initial`, enabled.
    pub fn new(kinematics: Kinematics, initial: Pose) -> Self {
        Self {
            kinematics,
            state: OdometryState {
                pose: Pose::new(initial.x, initial.y, initial.phi),
                ..Default::default()
            },
            enabled: true,
        }
    }

    /// Resume integration.
    #[inline]
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Freeze both integrators. The pose is kept.
    #[inline]
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Whether integration is active.
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Teleport the tracked point.
    pub fn set_pose(&mut self, pose: Pose) {
        self.state.pose = Pose::new(pose.x, pose.y, pose.phi);
    }

    /// Last integrated pose.
    #[inline]
    pub const fn pose(&self) -> Pose {
        self.state.pose
    }

    /// Last full output.
    #[inline]
    pub const fn state(&self) -> OdometryState {
        self.state
    }

    /// Integrate one cycle of wheel velocities.
    ///
    /// Velocities are always reported; the pose only moves while enabled
    /// and `dt > 0`.
    pub fn update(&mut self, wheels: Stamped<WheelVelocityPair>, dt: f64) -> Stamped<OdometryState> {
        let body = self.kinematics.forward(wheels.value);
        let phi = if self.enabled && dt > 0.0 {
            normalize_angle(self.state.pose.phi + body.omega * dt)
        } else {
            self.state.pose.phi
        };

        let global = Rotation2::new(phi) * Vector2::new(body.vx, body.vy);
        if self.enabled && dt > 0.0 {
            self.state.pose.x += global.x * dt;
            self.state.pose.y += global.y * dt;
            self.state.pose.phi = phi;
        }
        self.state.velocity = [global.x, global.y];
        self.state.omega = body.omega;

        Stamped::new(self.state, wheels.timestamp_ns)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
