//! Plant physics.
//!
//! One [`motor::DcMotorWheel`] per wheel; the wheels are independent, so the
//! robot pose follows from the wheel travel alone (no slip).

mod motor;

pub use motor::{DcMotorWheel, WheelParams};

use diffbot_common::consts::WHEEL_COUNT;
use diffbot_common::hal::config::{MotorConfig, SimulationConfig};

/// Two-wheel plant.
#[derive(Debug, Clone)]
pub struct DiffDrivePlant {
    wheels: [DcMotorWheel; WHEEL_COUNT],
    substeps: u32,
}

impl DiffDrivePlant {
    /// Plant at rest at the origin.
    pub fn new(motor: &MotorConfig, sim: &SimulationConfig) -> Self {
        let params = WheelParams::from_config(motor, sim);
        Self {
            wheels: [DcMotorWheel::new(params), DcMotorWheel::new(params)],
            substeps: sim.substeps.max(1),
        }
    }

    /// Apply `voltages` for `dt` seconds.
    pub fn step(&mut self, voltages: [f64; WHEEL_COUNT], dt: f64) {
        for (wheel, u) in self.wheels.iter_mut().zip(voltages) {
            wheel.step(u, dt, self.substeps);
        }
    }

    /// Wheel travel [m].
    pub fn positions(&self) -> [f64; WHEEL_COUNT] {
        [self.wheels[0].position(), self.wheels[1].position()]
    }

    /// Wheel velocities [m/s].
    pub fn velocities(&self) -> [f64; WHEEL_COUNT] {
        [self.wheels[0].velocity(), self.wheels[1].velocity()]
    }

    /// Motor currents of the last sub-step [A].
    pub fn currents(&self) -> [f64; WHEEL_COUNT] {
        [self.wheels[0].current(), self.wheels[1].current()]
    }
}
