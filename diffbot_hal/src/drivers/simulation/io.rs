//! Simulated operator panel: two buttons and two LEDs.
//!
//! Buttons can be set directly or scheduled at a simulated time, which lets
//! tests script an operator ("press pause at t = 50 ms, release at 60 ms").

use std::collections::VecDeque;

use diffbot_common::hal::types::{DigitalInput, DigitalInputs, DigitalOutputs};
use tracing::debug;

/// Button change queued for a simulated time.
#[derive(Debug, Clone, Copy)]
struct PendingInputChange {
    at_ns: u64,
    input: DigitalInput,
    value: bool,
}

/// Button and LED state.
#[derive(Debug, Default)]
pub struct IoSimulator {
    inputs: DigitalInputs,
    outputs: DigitalOutputs,
    pending: VecDeque<PendingInputChange>,
}

impl IoSimulator {
    /// All buttons released, LEDs dark.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a button now.
    pub fn set_input(&mut self, input: DigitalInput, value: bool) {
        self.inputs.set(input, value);
    }

    /// Queue a button change at simulated time `at_ns`.
    pub fn schedule(&mut self, at_ns: u64, input: DigitalInput, value: bool) {
        let pos = self.pending.partition_point(|c| c.at_ns <= at_ns);
        self.pending.insert(pos, PendingInputChange { at_ns, input, value });
    }

    /// Latch the LEDs, apply due button changes and return the button sample.
    pub fn cycle(&mut self, outputs: DigitalOutputs, now_ns: u64) -> DigitalInputs {
        self.outputs = outputs;
        while let Some(change) = self.pending.front().copied() {
            if change.at_ns > now_ns {
                break;
            }
            self.pending.pop_front();
            debug!(input = ?change.input, value = change.value, now_ns, "scripted input change");
            self.inputs.set(change.input, change.value);
        }
        self.inputs
    }

    /// Current button states.
    pub fn inputs(&self) -> DigitalInputs {
        self.inputs
    }

    /// LED states of the last cycle.
    pub fn outputs(&self) -> DigitalOutputs {
        self.outputs
    }

    /// Number of queued button changes.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
