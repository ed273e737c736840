//! System-wide constants shared by the control unit and the HAL drivers.

use static_assertions::const_assert;

/// Default control cycle time in microseconds (5 ms).
pub const DEFAULT_CYCLE_TIME_US: u32 = 5_000;

/// Shortest cycle time accepted by configuration validation [µs].
pub const MIN_CYCLE_TIME_US: u32 = 250;

/// Longest cycle time accepted by configuration validation [µs].
pub const MAX_CYCLE_TIME_US: u32 = 100_000;

/// Number of driven wheels (left, right).
pub const WHEEL_COUNT: usize = 2;

/// Index of the left wheel in per-wheel arrays.
pub const LEFT: usize = 0;

/// Index of the right wheel in per-wheel arrays.
pub const RIGHT: usize = 1;

const_assert!(MIN_CYCLE_TIME_US <= DEFAULT_CYCLE_TIME_US);
const_assert!(DEFAULT_CYCLE_TIME_US <= MAX_CYCLE_TIME_US);
const_assert!(LEFT < WHEEL_COUNT && RIGHT < WHEEL_COUNT);
