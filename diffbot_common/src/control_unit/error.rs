//! Fault bitflags for the Control Unit.
//!
//! Flags marked CRITICAL raise the `Abort` safety event. Diagnostic flags
//! are informational and never change pipeline behaviour.

use bitflags::bitflags;

bitflags! {
    /// Per-cycle fault flags.
    ///
    /// CRITICAL flags (→ Abort): CYCLE_OVERRUN, NON_FINITE_OUTPUT, HAL_FAULT.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u16 {
        /// Torque command clamped to the motor force limit.
        const TORQUE_SATURATED   = 0x0001;
        /// Velocity feed-forward clamped to the motor speed limit.
        const VELOCITY_SATURATED = 0x0002;
        /// Estimator state went non-finite and was re-seeded.
        const ESTIMATOR_RESET    = 0x0004;
        /// Cycle exceeded its budget. **CRITICAL → Abort**.
        const CYCLE_OVERRUN      = 0x0100;
        /// A stage produced a non-finite voltage (replaced by 0). **CRITICAL → Abort**.
        const NON_FINITE_OUTPUT  = 0x0200;
        /// HAL driver reported a failure. **CRITICAL → Abort**.
        const HAL_FAULT          = 0x0400;
    }
}

impl FaultFlags {
    /// Mask of all CRITICAL flags that raise Abort.
    pub const CRITICAL_MASK: Self = Self::from_bits_truncate(
        Self::CYCLE_OVERRUN.bits() | Self::NON_FINITE_OUTPUT.bits() | Self::HAL_FAULT.bits(),
    );

    /// Returns true if any CRITICAL flag is set.
    #[inline]
    pub const fn has_critical(&self) -> bool {
        self.intersects(Self::CRITICAL_MASK)
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
