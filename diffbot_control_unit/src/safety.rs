//! Safety module root.
//!
//! Static level tables (transitions, input checks, LED patterns) and the
//! supervisor that executes them once per cycle ahead of the pipeline.

pub mod levels;
pub mod supervisor;
