//! Pose, velocity and timestamped signal types.
//!
//! All angles handed across stage boundaries are normalised to (−π, π]
//! with [`normalize_angle`].

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Wrap an angle into (−π, π].
///
/// Non-finite input is returned unchanged so the caller can detect it.
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Planar robot pose in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// X position [m].
    pub x: f64,
    /// Y position [m].
    pub y: f64,
    /// Heading [rad], wrapped to (−π, π].
    pub phi: f64,
}

impl Pose {
    /// Build a pose; the heading is normalised.
    pub fn new(x: f64, y: f64, phi: f64) -> Self {
        Self {
            x,
            y,
            phi: normalize_angle(phi),
        }
    }

    /// Euclidean distance to a point.
    #[inline]
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (x - self.x).hypot(y - self.y)
    }
}

/// Target pose for the pose-tracking planner.
///
/// `phi == None` keeps whatever heading the robot has when it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetPose {
    /// Target X [m].
    pub x: f64,
    /// Target Y [m].
    pub y: f64,
    /// Target heading [rad].
    #[serde(default)]
    pub phi: Option<f64>,
}

impl TargetPose {
    /// Target with an explicit final heading.
    pub fn new(x: f64, y: f64, phi: f64) -> Self {
        Self {
            x,
            y,
            phi: Some(normalize_angle(phi)),
        }
    }

    /// Target position only.
    pub const fn position(x: f64, y: f64) -> Self {
        Self { x, y, phi: None }
    }
}

/// Left/right wheel linear velocities [m/s].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelVelocityPair {
    /// Left wheel [m/s].
    pub left: f64,
    /// Right wheel [m/s].
    pub right: f64,
}

impl WheelVelocityPair {
    /// Build from left/right values.
    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// As a `[left, right]` array, indexed by `consts::LEFT` / `consts::RIGHT`.
    #[inline]
    pub const fn to_array(self) -> [f64; 2] {
        [self.left, self.right]
    }

    /// From a `[left, right]` array.
    #[inline]
    pub const fn from_array(values: [f64; 2]) -> Self {
        Self {
            left: values[0],
            right: values[1],
        }
    }
}

/// Body-frame velocity command: forward speed and yaw rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    /// Forward velocity [m/s].
    pub v: f64,
    /// Yaw rate [rad/s].
    pub omega: f64,
}

impl Twist {
    /// Zero velocity.
    pub const ZERO: Self = Self { v: 0.0, omega: 0.0 };

    /// Build a twist.
    pub const fn new(v: f64, omega: f64) -> Self {
        Self { v, omega }
    }
}

/// A value tagged with the timestamp of the sample it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stamped<T> {
    /// Carried value.
    pub value: T,
    /// Source sample timestamp [ns].
    pub timestamp_ns: u64,
}

impl<T> Stamped<T> {
    /// Tag a value with a timestamp.
    pub const fn new(value: T, timestamp_ns: u64) -> Self {
        Self {
            value,
            timestamp_ns,
        }
    }

    /// Transform the value, keeping the timestamp.
    #[inline]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Stamped<U> {
        Stamped {
            value: f(self.value),
            timestamp_ns: self.timestamp_ns,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
