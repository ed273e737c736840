//! TCP position controller.
//!
//! Proportional law on the world-frame TCP position error with a speed
//! limit: `GvT = min(K·‖e‖, v_max) · e/‖e‖`, `K = f / 3.2 / (2·D)`.

use std::sync::Arc;

use diffbot_common::control_unit::config::TcpConfig;
use diffbot_common::motion::Stamped;
use nalgebra::Vector2;

use super::target::{TargetHandle, TargetSlot, TcpTargetHandle};

/// TCP guidance stage.
#[derive(Debug)]
pub struct TcpController {
    gain: f64,
    max_velocity: f64,
    tolerance: f64,
    slot: Arc<TargetSlot<[f64; 2]>>,
    enabled: bool,
}

impl TcpController {
    /// Create a disabled controller holding `initial` as an already reached target.
    pub fn new(config: &TcpConfig, initial: [f64; 2]) -> Self {
        Self {
            gain: config.gain(),
            max_velocity: config.max_velocity,
            tolerance: config.tolerance,
            slot: Arc::new(TargetSlot::new(initial)),
            enabled: false,
        }
    }

    /// Sequencer handle for the TCP target.
    pub fn handle(&self) -> TcpTargetHandle {
        TargetHandle::new(Arc::clone(&self.slot))
    }

    /// Enable or disable the stage.
    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Position gain K [1/s].
    #[inline]
    pub const fn gain(&self) -> f64 {
        self.gain
    }

    /// World-frame TCP velocity command for the measured TCP `position`.
    pub fn run(&mut self, position: Stamped<[f64; 2]>) -> Stamped<Vector2<f64>> {
        if !self.enabled {
            return Stamped::new(Vector2::zeros(), position.timestamp_ns);
        }

        let snapshot = self.slot.snapshot();
        let error = Vector2::from(snapshot.target) - Vector2::from(position.value);
        let distance = error.norm();

        if distance < self.tolerance {
            if !snapshot.reached {
                self.slot.mark_reached(snapshot.generation);
            }
            if distance == 0.0 {
                return Stamped::new(Vector2::zeros(), position.timestamp_ns);
            }
        }

        let speed = (self.gain * distance).min(self.max_velocity);
        Stamped::new(error * (speed / distance), position.timestamp_ns)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
