//! HAL driver trait and error types.
//!
//! This module defines:
//! - `HalDriver` trait - Interface for pluggable HAL drivers
//! - `HalError` enum - Error types for HAL operations
//! - `DriverFactory` type alias - Factory function type

use crate::hal::config::{HalConfig, MotorConfig};
use crate::hal::types::{HalCommands, HalStatus};
use std::time::Duration;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn HalDriver>;

/// Trait defining the interface for HAL drivers.
///
/// The control unit owns exactly one driver and talks to the robot only
/// through it (simulation, real motor bridge, ...).
///
/// # Lifecycle
///
/// 1. `init()` - Called once before the cycle loop starts
/// 2. `cycle()` - Called once per control cycle
/// 3. `shutdown()` - Called after the cycle loop exits
///
/// # Timing Contracts
///
/// | Operation | Max Duration | RT Constraint |
/// |-----------|--------------|---------------|
/// | `init()` | 30 seconds | None (pre-RT) |
/// | `cycle()` | cycle_time_us | **HARD** |
/// | `shutdown()` | 1 second | None (post-RT) |
pub trait HalDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if initialization cannot complete.
    fn init(&mut self, config: &HalConfig, motor: &MotorConfig) -> Result<(), HalError>;

    /// Execute one cycle of the driver.
    ///
    /// Applies `commands` (the voltages and LED states computed in the
    /// previous control cycle), advances by `dt`, and returns the fresh
    /// encoder and button sample.
    ///
    /// # Timing
    /// - MUST complete within `cycle_time_us`
    /// - Should be deterministic (no allocations, no blocking I/O)
    fn cycle(&mut self, commands: &HalCommands, dt: Duration) -> Result<HalStatus, HalError>;

    /// Graceful shutdown of the driver. Motors must be left unpowered.
    fn shutdown(&mut self) -> Result<(), HalError>;
}
