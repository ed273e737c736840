//! Differential-drive kinematics.
//!
//! Forward map (wheels → body) used by odometry, inverse map (body → wheels)
//! used after guidance. The TCP form first rotates a global TCP velocity
//! into the body frame and converts its lateral part into a yaw rate
//! through the lever arm L.

use diffbot_common::motion::{Twist, WheelVelocityPair};
use nalgebra::{Matrix2, Rotation2, Vector2};

/// Body velocity produced by the forward map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyVelocity {
    /// Forward velocity of the tracked point [m/s].
    pub vx: f64,
    /// Lateral velocity of the tracked point [m/s] (L·ω).
    pub vy: f64,
    /// Yaw rate [rad/s].
    pub omega: f64,
}

/// Wheel/body velocity maps for a robot with wheel separation B and TCP lever arm L.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    wheel_separation: f64,
    lever_arm: f64,
    /// `[vL, vR] = inverse · [v, ω]`.
    inverse: Matrix2<f64>,
}

impl Kinematics {
    /// Build the maps. `lever_arm` may be zero unless the TCP form is used.
    pub fn new(wheel_separation: f64, lever_arm: f64) -> Self {
        let half = wheel_separation / 2.0;
        Self {
            wheel_separation,
            lever_arm,
            inverse: Matrix2::new(1.0, -half, 1.0, half),
        }
    }

    /// Wheel separation B [m].
    #[inline]
    pub const fn wheel_separation(&self) -> f64 {
        self.wheel_separation
    }

    /// Lever arm L [m].
    #[inline]
    pub const fn lever_arm(&self) -> f64 {
        self.lever_arm
    }

    /// Wheels → body velocity of the tracked point.
    #[inline]
    pub fn forward(&self, wheels: WheelVelocityPair) -> BodyVelocity {
        let omega = (wheels.right - wheels.left) / self.wheel_separation;
        BodyVelocity {
            vx: 0.5 * (wheels.left + wheels.right),
            vy: self.lever_arm * omega,
            omega,
        }
    }

    /// Body twist → wheel velocities.
    #[inline]
    pub fn inverse(&self, twist: Twist) -> WheelVelocityPair {
        let w = self.inverse * Vector2::new(twist.v, twist.omega);
        WheelVelocityPair::new(w.x, w.y)
    }

    /// Global TCP velocity → body twist: `RvT = R(phi)ᵀ·GvT`, `v = RvT.x`, `ω = RvT.y / L`.
    ///
    /// A zero lever arm yields a zero yaw rate.
    #[inline]
    pub fn tcp_twist(&self, global_velocity: Vector2<f64>, phi: f64) -> Twist {
        let body = Rotation2::new(phi).inverse() * global_velocity;
        let omega = if self.lever_arm != 0.0 {
            body.y / self.lever_arm
        } else {
            0.0
        };
        Twist::new(body.x, omega)
    }

    /// Global TCP velocity → wheel velocities.
    #[inline]
    pub fn inverse_tcp(&self, global_velocity: Vector2<f64>, phi: f64) -> WheelVelocityPair {
        self.inverse(self.tcp_twist(global_velocity, phi))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
