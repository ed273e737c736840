//! Diffbot Common Library
//!
//! Shared types, constants and configuration loading for the differential-drive
//! control workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide constants
//! - [`motion`] - Pose, velocity and timestamped signal types
//! - [`control_unit`] - Control unit configuration, safety levels and fault flags
//! - [`hal`] - Hardware abstraction boundary (driver trait, commands, status)
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use diffbot_common::prelude::*;
//!
//! let pose = Pose::new(0.5, 0.0, 0.0);
//! assert_eq!(pose.x, 0.5);
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod motion;
pub mod prelude;
