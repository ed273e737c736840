//! Lyapunov pose-tracking planner.
//!
//! Polar-coordinate pursuit law:
//!
//! ```text
//! rho   = |target − position|
//! gamma = atan2(dy, dx) − phi
//! delta = gamma + phi − phi_target
//! v     = k1·rho·cos(gamma)
//! omega = k2·gamma + k1·sin(gamma)·cos(gamma)·(gamma + k3·delta) / gamma
//! ```
//!
//! For |gamma| ≤ rotation tolerance the ratio sin(γ)/γ is replaced by its
//! limit 1.

use std::sync::Arc;

use diffbot_common::control_unit::config::PlannerConfig;
use diffbot_common::motion::{Pose, Stamped, TargetPose, Twist, normalize_angle};

use super::target::{PlannerHandle, TargetHandle, TargetSlot};

/// Result of one evaluation of the pursuit law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PursuitOutput {
    /// Commanded body twist.
    pub twist: Twist,
    /// Distance to the target [m].
    pub rho: f64,
    /// Whether the target lies within the position tolerance.
    pub reached: bool,
}

/// Evaluate the pursuit law for `pose` → `target`.
///
/// A target without heading keeps the current heading.
pub fn pursuit_law(config: &PlannerConfig, pose: &Pose, target: &TargetPose) -> PursuitOutput {
    let dx = target.x - pose.x;
    let dy = target.y - pose.y;
    let rho = pose.distance_to(target.x, target.y);

    if rho <= config.position_tolerance {
        return PursuitOutput {
            twist: Twist::ZERO,
            rho,
            reached: true,
        };
    }

    let phi_target = target.phi.unwrap_or(pose.phi);
    let gamma = normalize_angle(dy.atan2(dx) - pose.phi);
    let delta = normalize_angle(gamma + pose.phi - phi_target);

    let (sin_g, cos_g) = gamma.sin_cos();
    let coupling = if gamma.abs() <= config.rotation_tolerance {
        cos_g
    } else {
        sin_g * cos_g / gamma
    };

    PursuitOutput {
        twist: Twist::new(
            config.k1 * rho * cos_g,
            config.k2 * gamma + config.k1 * coupling * (gamma + config.k3 * delta),
        ),
        rho,
        reached: false,
    }
}

/// Pose-tracking guidance stage.
#[derive(Debug)]
pub struct Planner {
    config: PlannerConfig,
    slot: Arc<TargetSlot<TargetPose>>,
    enabled: bool,
}

impl Planner {
    /// Create a disabled planner holding `initial` as an already reached target.
    pub fn new(config: PlannerConfig, initial: TargetPose) -> Self {
        Self {
            config,
            slot: Arc::new(TargetSlot::new(initial)),
            enabled: false,
        }
    }

    /// Sequencer handle for this planner's target.
    pub fn handle(&self) -> PlannerHandle {
        TargetHandle::new(Arc::clone(&self.slot))
    }

    /// Enable or disable the stage.
    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the stage is enabled.
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Compute the body twist for this cycle.
    ///
    /// Disabled or target already reached → zero. Within tolerance → zero
    /// and the target is marked reached; it stays reached until the next
    /// `set_target`, even if the robot drifts off afterwards.
    pub fn run(&mut self, pose: Stamped<Pose>) -> Stamped<Twist> {
        if !self.enabled {
            return Stamped::new(Twist::ZERO, pose.timestamp_ns);
        }

        let snapshot = self.slot.snapshot();
        if snapshot.reached {
            return Stamped::new(Twist::ZERO, pose.timestamp_ns);
        }
        let out = pursuit_law(&self.config, &pose.value, &snapshot.target);
        if out.reached {
            self.slot.mark_reached(snapshot.generation);
        }
        Stamped::new(out.twist, pose.timestamp_ns)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
