//! Control pipeline root.
//!
//! Stages in cycle order: estimator/differencing, odometry, guidance
//! (planner or TCP), inverse kinematics, velocity controllers, inverse
//! motor model. [`pipeline`] composes them; [`servo`] is the single-joint
//! variant.

pub mod controller;
pub mod estimator;
pub mod kinematics;
pub mod motor_model;
pub mod odometry;
pub mod pipeline;
pub mod planner;
pub mod servo;
pub mod target;
pub mod tcp;
