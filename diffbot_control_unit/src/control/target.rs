//! Target slots shared between the sequencer thread and the cycle thread.
//!
//! The sequencer writes a new target, the guidance stage copies it once per
//! cycle and reports back when it has been reached. Every write bumps a
//! generation counter; a cycle may only mark the generation it actually
//! worked on as reached, so a target written while that cycle was running
//! is never reported as reached by it.

use std::sync::Arc;

use diffbot_common::motion::TargetPose;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct SlotState<T> {
    target: T,
    generation: u64,
    reached_generation: u64,
}

/// Copy of a slot taken by the cycle thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSnapshot<T> {
    /// Current target.
    pub target: T,
    /// Generation of `target`.
    pub generation: u64,
    /// Whether `target` has already been reached.
    pub reached: bool,
}

/// Progress of the current target as seen by the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetStatus {
    /// The most recently written target has been reached.
    pub reached: bool,
    /// Number of targets written so far.
    pub generation: u64,
}

/// Mutex-guarded target with reached tracking.
///
/// The lock is held only for the copy in and out.
#[derive(Debug)]
pub struct TargetSlot<T> {
    inner: Mutex<SlotState<T>>,
}

impl<T: Copy> TargetSlot<T> {
    /// Create a slot holding `initial`, already reached.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(SlotState {
                target: initial,
                generation: 0,
                reached_generation: 0,
            }),
        }
    }

    /// Replace the target and clear the reached flag.
    pub fn set(&self, target: T) -> u64 {
        let mut state = self.inner.lock();
        state.target = target;
        state.generation += 1;
        state.generation
    }

    /// Copy the current target.
    #[inline]
    pub fn snapshot(&self) -> TargetSnapshot<T> {
        let state = self.inner.lock();
        TargetSnapshot {
            target: state.target,
            generation: state.generation,
            reached: state.reached_generation == state.generation,
        }
    }

    /// Mark `generation` as reached. Ignored if a newer target was written since.
    #[inline]
    pub fn mark_reached(&self, generation: u64) -> bool {
        let mut state = self.inner.lock();
        if state.generation == generation {
            state.reached_generation = generation;
            true
        } else {
            false
        }
    }

    /// Reached status of the most recent target.
    #[inline]
    pub fn status(&self) -> TargetStatus {
        let state = self.inner.lock();
        TargetStatus {
            reached: state.reached_generation == state.generation,
            generation: state.generation,
        }
    }
}

/// Cloneable sequencer-side handle to a [`TargetSlot`].
#[derive(Debug)]
pub struct TargetHandle<T> {
    slot: Arc<TargetSlot<T>>,
}

impl<T> Clone for TargetHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Copy> TargetHandle<T> {
    pub(crate) fn new(slot: Arc<TargetSlot<T>>) -> Self {
        Self { slot }
    }

    /// Write a new target; returns its generation.
    pub fn set_target(&self, target: T) -> u64 {
        self.slot.set(target)
    }

    /// Current target.
    pub fn target(&self) -> T {
        self.slot.snapshot().target
    }

    /// Reached status of the most recent target.
    pub fn status(&self) -> TargetStatus {
        self.slot.status()
    }
}

impl TargetHandle<f64> {
    /// Write a new servo setpoint [m].
    pub fn set_setpoint(&self, setpoint: f64) -> u64 {
        self.set_target(setpoint)
    }
}

/// Handle to the pose-tracking planner target.
pub type PlannerHandle = TargetHandle<TargetPose>;
/// Handle to the TCP position target `[x, y]`.
pub type TcpTargetHandle = TargetHandle<[f64; 2]>;
/// Handle to the servo setpoint.
pub type ServoHandle = TargetHandle<f64>;

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_is_reached() {
        let slot = TargetSlot::new(1.0_f64);
        let snap = slot.snapshot();
        assert!(snap.reached);
        assert_eq!(snap.generation, 0);
        assert_eq!(snap.target, 1.0);
    }

    #[test]
    fn set_clears_reached() {
        let slot = TargetSlot::new(0.0_f64);
        let generation = slot.set(2.0);
        assert_eq!(generation, 1);
        assert!(!slot.status().reached);
        assert!(slot.mark_reached(generation));
        assert!(slot.status().reached);
    }

    #[test]
    fn stale_generation_cannot_mark_reached() {
        let slot = TargetSlot::new([0.0, 0.0]);
        let first = slot.set([1.0, 0.0]);
        let snap = slot.snapshot();
        // Sequencer writes again while the cycle still works on `first`.
        slot.set([2.0, 0.0]);
        assert!(!slot.mark_reached(snap.generation));
        assert_eq!(snap.generation, first);
        assert!(!slot.status().reached);
        assert_eq!(slot.snapshot().target, [2.0, 0.0]);
    }

    #[test]
    fn handles_share_the_slot() {
        let slot = Arc::new(TargetSlot::new(TargetPose::default()));
        let a: PlannerHandle = TargetHandle::new(Arc::clone(&slot));
        let b = a.clone();
        a.set_target(TargetPose::new(0.5, 0.0, 0.0));
        assert_eq!(b.target().x, 0.5);
        assert!(!b.status().reached);
    }

    #[test]
    fn servo_setpoint_alias() {
        let handle: ServoHandle = TargetHandle::new(Arc::new(TargetSlot::new(0.0)));
        handle.set_setpoint(0.02);
        assert_eq!(handle.target(), 0.02);
    }

    #[test]
    fn concurrent_writers_never_tear() {
        let slot = Arc::new(TargetSlot::new([0.0_f64, 0.0]));
        let writer = {
            let slot = Arc::clone(&slot);
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    let v = i as f64;
                    slot.set([v, -v]);
                }
            })
        };
        for _ in 0..10_000 {
            let t = slot.snapshot().target;
            assert_eq!(t[0], -t[1]);
        }
        writer.join().unwrap();
    }
}
