//! Inverse DC motor model: force + velocity → terminal voltage.
//!
//! `U = R·clamp(Q, ±Qmax)/i/kM + kM·i·clamp(qd, ±qdmax)`

use diffbot_common::control_unit::error::FaultFlags;
use diffbot_common::hal::config::MotorConfig;

/// Motor voltage and the diagnostic flags raised computing it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorCommand {
    /// Terminal voltage [V].
    pub voltage: f64,
    /// `TORQUE_SATURATED` / `VELOCITY_SATURATED` when a clamp was active.
    pub flags: FaultFlags,
}

/// Inverse motor model for one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorModel {
    max_force: f64,
    max_velocity: f64,
    /// R / i / kM
    force_gain: f64,
    /// kM · i
    emf_gain: f64,
}

impl MotorModel {
    /// Build from the drive-train parameters.
    pub fn new(motor: &MotorConfig) -> Self {
        Self::with_force_limit(motor, motor.max_force)
    }

    /// Build with a force clamp other than the motor's own.
    pub fn with_force_limit(motor: &MotorConfig, max_force: f64) -> Self {
        Self {
            max_force,
            max_velocity: motor.max_velocity,
            force_gain: motor.resistance / motor.transmission / motor.torque_constant,
            emf_gain: motor.torque_constant * motor.transmission,
        }
    }

    /// Largest voltage magnitude the model can command [V].
    #[inline]
    pub fn max_voltage(&self) -> f64 {
        self.force_gain * self.max_force + self.emf_gain * self.max_velocity
    }

    /// Voltage for `force` [N] at `velocity` [m/s]. Non-finite input → 0 V.
    #[inline]
    pub fn voltage(&self, force: f64, velocity: f64) -> MotorCommand {
        if !force.is_finite() || !velocity.is_finite() {
            return MotorCommand::default();
        }

        let mut flags = FaultFlags::empty();
        if force.abs() > self.max_force {
            flags |= FaultFlags::TORQUE_SATURATED;
        }
        if velocity.abs() > self.max_velocity {
            flags |= FaultFlags::VELOCITY_SATURATED;
        }

        let q = force.clamp(-self.max_force, self.max_force);
        let qd = velocity.clamp(-self.max_velocity, self.max_velocity);
        MotorCommand {
            voltage: self.force_gain * q + self.emf_gain * qd,
            flags,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
