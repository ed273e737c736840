//! DC motor with transmission, seen from the wheel.
//!
//! Armature inductance is neglected:
//!
//! ```text
//! I = (U - kM·i·v) / R
//! F = i·kM·I - b·v
//! a = F / M
//! ```
//!
//! with `i` the transmission ratio including the wheel radius [1/m] and `M`
//! the effective mass per wheel. Integrated with semi-implicit Euler over
//! `substeps` per cycle.

use diffbot_common::hal::config::{MotorConfig, SimulationConfig};
use tracing::trace;

/// Per-wheel plant parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelParams {
    /// Transmission ratio including wheel radius [1/m].
    pub transmission: f64,
    /// Motor torque constant [N·m/A].
    pub torque_constant: f64,
    /// Armature resistance [Ω].
    pub resistance: f64,
    /// Effective mass [kg].
    pub mass: f64,
    /// Viscous friction [N·s/m].
    pub damping: f64,
}

impl WheelParams {
    /// Parameters from the drive-train and simulation sections.
    pub fn from_config(motor: &MotorConfig, sim: &SimulationConfig) -> Self {
        Self {
            transmission: motor.transmission,
            torque_constant: motor.torque_constant,
            resistance: motor.resistance,
            mass: sim.effective_mass.unwrap_or_else(|| motor.reflected_inertia()),
            damping: sim.viscous_damping,
        }
    }

    /// Back-EMF per wheel velocity [V·s/m].
    #[inline]
    pub fn emf_constant(&self) -> f64 {
        self.torque_constant * self.transmission
    }

    /// Steady-state velocity under constant `voltage` [m/s].
    pub fn steady_state_velocity(&self, voltage: f64) -> f64 {
        let ke = self.emf_constant();
        ke * voltage / (ke * ke + self.damping * self.resistance)
    }
}

/// One simulated wheel.
#[derive(Debug, Clone)]
pub struct DcMotorWheel {
    params: WheelParams,
    position: f64,
    velocity: f64,
    current: f64,
}

impl DcMotorWheel {
    /// Wheel at rest at position 0.
    pub fn new(params: WheelParams) -> Self {
        Self {
            params,
            position: 0.0,
            velocity: 0.0,
            current: 0.0,
        }
    }

    /// Advance by `dt` seconds under `voltage`. Non-finite voltages count as 0.
    pub fn step(&mut self, voltage: f64, dt: f64, substeps: u32) {
        let u = if voltage.is_finite() {
            voltage
        } else {
            trace!(voltage, "non-finite voltage, applying 0 V");
            0.0
        };
        if dt.is_nan() || dt <= 0.0 {
            return;
        }
        let p = &self.params;
        let ke = p.emf_constant();
        let h = dt / f64::from(substeps.max(1));
        for _ in 0..substeps.max(1) {
            self.current = (u - ke * self.velocity) / p.resistance;
            let force = ke * self.current - p.damping * self.velocity;
            self.velocity += force / p.mass * h;
            self.position += self.velocity * h;
        }
    }

    /// Wheel travel [m].
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Wheel velocity [m/s].
    #[inline]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Armature current of the last sub-step [A].
    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }
}
