//! Error module root.
//!
//! Per-cycle fault evaluation: CRITICAL → Abort, diagnostic → counted only.

pub mod propagation;
