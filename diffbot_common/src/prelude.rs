//! Prelude module for common re-exports.
//!
//! ```rust
//! use diffbot_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::control_unit::config::ControlUnitConfig;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, LEFT, RIGHT, WHEEL_COUNT};

// ─── Motion ─────────────────────────────────────────────────────────
pub use crate::motion::{Pose, Stamped, TargetPose, Twist, WheelVelocityPair, normalize_angle};

// ─── Safety ─────────────────────────────────────────────────────────
pub use crate::control_unit::error::FaultFlags;
pub use crate::control_unit::state::{PipelineVariant, SafetyEvent, SafetyLevel, Visibility};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::driver::{HalDriver, HalError};
pub use crate::hal::types::{DigitalInputs, DigitalOutputs, HalCommands, HalStatus};

/// Default system cycle time as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(DEFAULT_CYCLE_TIME_US as u64);
