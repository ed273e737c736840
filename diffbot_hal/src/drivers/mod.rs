//! HAL driver implementations.
//!
//! - [`simulation`] - Differential-drive plant simulation for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `HalDriver` trait from `diffbot_common::hal::driver`
//! 3. Register the factory in [`register_all_drivers`]

pub mod simulation;

use tracing::warn;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver into `registry`.
///
/// Names already present are left untouched.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    if let Err(e) = registry.register(simulation::DRIVER_NAME, simulation::create_driver) {
        warn!("{e}");
    }
}
