//! Control Unit shared types.
//!
//! Organized by domain: configuration structures, controller
//! parameterisation, fault bitflags, and safety level/event enums.

pub mod config;
pub mod control;
pub mod error;
pub mod state;
