//! # Diffbot Control Unit Library
//!
//! Fixed-rate motion control for a two-wheel differential-drive robot and
//! its single-joint servo variant. Every cycle reads encoders and buttons
//! from the HAL, runs the safety supervisor, runs the control pipeline and
//! hands wheel voltages and LED states back to the HAL.
//!
//! ## Layers
//!
//! 1. **Safety supervisor** ([`safety`]) — nine ordered levels, table-driven
//!    transitions, gates the pipeline stages
//! 2. **Control pipeline** ([`control`]) — odometry, guidance (pose planner or
//!    TCP controller), inverse kinematics, velocity PI, inverse motor model,
//!    optional Kalman estimator
//! 3. **Cycle runner** ([`cycle`]) — HAL driver, pacing, fault evaluation
//! 4. **Sequences** ([`sequence`]) — target steps executed on a second thread
//!
//! Only the target slots and the supervisor level are shared between
//! threads, each behind a `parking_lot::Mutex` held for a copy.

#![deny(clippy::disallowed_types)]

pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod safety;
pub mod sequence;
