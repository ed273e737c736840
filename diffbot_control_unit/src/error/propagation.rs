//! Fault evaluation and diagnostic counters.
//!
//! The cycle runner merges the pipeline's fault flags with its own
//! (overrun, HAL failure) and evaluates them once per cycle. Critical
//! flags ask for an Abort; saturation and estimator resets are only
//! counted so that clamping never changes the control behaviour.
//!
//! All functions are allocation-free.

use diffbot_common::control_unit::error::FaultFlags;

// ─── Propagation Result ─────────────────────────────────────────────

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationResult {
    /// At least one CRITICAL flag was set → raise Abort.
    pub abort_required: bool,
    /// The critical subset of the evaluated flags.
    pub critical: FaultFlags,
}

/// Classify one cycle's flags.
#[inline]
pub fn evaluate_faults(flags: FaultFlags) -> PropagationResult {
    let critical = flags & FaultFlags::CRITICAL_MASK;
    PropagationResult {
        abort_required: !critical.is_empty(),
        critical,
    }
}

// ─── Counters ───────────────────────────────────────────────────────

/// Running count of cycles in which each flag was set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounters {
    /// Cycles with a clamped torque command.
    pub torque_saturated: u64,
    /// Cycles with a clamped velocity feed-forward.
    pub velocity_saturated: u64,
    /// Estimator re-seeds.
    pub estimator_resets: u64,
    /// Cycle budget overruns.
    pub overruns: u64,
    /// Non-finite voltages replaced by 0.
    pub non_finite_outputs: u64,
    /// Failed HAL cycles.
    pub hal_faults: u64,
}

impl FaultCounters {
    /// Add one cycle's flags.
    pub fn record(&mut self, flags: FaultFlags) {
        let pairs = [
            (FaultFlags::TORQUE_SATURATED, &mut self.torque_saturated),
            (FaultFlags::VELOCITY_SATURATED, &mut self.velocity_saturated),
            (FaultFlags::ESTIMATOR_RESET, &mut self.estimator_resets),
            (FaultFlags::CYCLE_OVERRUN, &mut self.overruns),
            (FaultFlags::NON_FINITE_OUTPUT, &mut self.non_finite_outputs),
            (FaultFlags::HAL_FAULT, &mut self.hal_faults),
        ];
        for (flag, counter) in pairs {
            if flags.contains(flag) {
                *counter += 1;
            }
        }
    }

    /// Sum of all critical counters.
    pub const fn critical_total(&self) -> u64 {
        self.overruns + self.non_finite_outputs + self.hal_faults
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_flags_need_no_abort() {
        let r = evaluate_faults(FaultFlags::empty());
        assert!(!r.abort_required);
        assert!(r.critical.is_empty());
    }

    #[test]
    fn saturation_alone_is_diagnostic() {
        let r = evaluate_faults(FaultFlags::TORQUE_SATURATED | FaultFlags::VELOCITY_SATURATED);
        assert!(!r.abort_required);
    }

    #[test]
    fn critical_subset_is_reported() {
        let r = evaluate_faults(FaultFlags::TORQUE_SATURATED | FaultFlags::CYCLE_OVERRUN);
        assert!(r.abort_required);
        assert_eq!(r.critical, FaultFlags::CYCLE_OVERRUN);
    }

    #[test]
    fn counters_accumulate_per_flag() {
        let mut c = FaultCounters::default();
        c.record(FaultFlags::TORQUE_SATURATED);
        c.record(FaultFlags::TORQUE_SATURATED | FaultFlags::HAL_FAULT);
        c.record(FaultFlags::empty());
        assert_eq!(c.torque_saturated, 2);
        assert_eq!(c.hal_faults, 1);
        assert_eq!(c.velocity_saturated, 0);
        assert_eq!(c.critical_total(), 1);
    }
}
