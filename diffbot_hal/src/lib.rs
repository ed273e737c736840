//! # Diffbot HAL Library
//!
//! Pluggable HAL drivers for the control unit. Drivers implement the
//! `HalDriver` trait from `diffbot_common::hal::driver` and are created by
//! name through a [`DriverRegistry`].
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     diffbot_control_unit                     │
//! │   CycleRunner ──► Box<dyn HalDriver> ◄── DriverRegistry      │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │ voltages, LEDs ▼  ▲ encoders, buttons
//! ┌───────────────────────────┴──────────────────────────────────┐
//! │  SimulationDriver: two DC motors + transmission, button IO   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::{SimulationDriver, SimulationHandle};
