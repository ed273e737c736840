//! Hardware abstraction boundary.
//!
//! - [`config`] - Drive-train parameters and driver selection
//! - [`driver`] - `HalDriver` trait and `HalError`
//! - [`types`] - Per-cycle commands and status

pub mod config;
pub mod driver;
pub mod types;
