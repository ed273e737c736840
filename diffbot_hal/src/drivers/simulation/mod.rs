//! Simulation driver module.
//!
//! Software plant for running the control unit without hardware: two DC
//! motors driving the wheels through a transmission, encoders reporting the
//! wheel travel, operator buttons scriptable from tests and LEDs observable
//! through a [`SimulationHandle`].

mod driver;
mod io;
mod physics;

pub use driver::{SimulationDriver, SimulationHandle};
pub use io::IoSimulator;
pub use physics::{DiffDrivePlant, WheelParams};

use diffbot_common::hal::driver::HalDriver;

/// Registry name of the simulation driver.
pub const DRIVER_NAME: &str = "simulation";

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SimulationDriver::new())
}
