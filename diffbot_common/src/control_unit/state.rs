//! Safety level and event enums for the Control Unit.
//!
//! All enums use `#[repr(u8)]` for a compact layout. `SafetyLevel` is
//! ordered: the declaration order is the escalation order used for
//! "all levels between" ranges and for `>=` checks in motion sequences.

use serde::{Deserialize, Serialize};

/// Operational safety level.
///
/// Exactly one level is active at any time. The entry level is `SystemOff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SafetyLevel {
    /// System is offline; the executor is asked to stop.
    #[default]
    SystemOff = 0,
    /// Pipeline disabled and stopped, about to go offline.
    ShuttingDown = 1,
    /// Guidance off, waiting for the wheels to halt before shutting down.
    Braking = 2,
    /// Pipeline starting.
    StartingUp = 3,
    /// Emergency latched, waiting for the operator reset.
    Emergency = 4,
    /// Guidance off, waiting for the wheels to halt before latching the emergency.
    EmergencyBraking = 5,
    /// System online, motors unpowered for motion.
    SystemOn = 6,
    /// Motors powered, guidance enabled.
    MotorPowerOn = 7,
    /// Robot in motion.
    SystemMoving = 8,
}

impl SafetyLevel {
    /// All levels in escalation order.
    pub const ALL: [Self; 9] = [
        Self::SystemOff,
        Self::ShuttingDown,
        Self::Braking,
        Self::StartingUp,
        Self::Emergency,
        Self::EmergencyBraking,
        Self::SystemOn,
        Self::MotorPowerOn,
        Self::SystemMoving,
    ];

    /// True if `self` lies in the inclusive range `[low, high]`.
    #[inline]
    pub const fn is_between(self, low: Self, high: Self) -> bool {
        (self as u8) >= (low as u8) && (self as u8) <= (high as u8)
    }

    /// Human-readable description used in transition logs.
    pub const fn description(self) -> &'static str {
        match self {
            Self::SystemOff => "System is offline",
            Self::ShuttingDown => "System shutting down",
            Self::Braking => "System braking",
            Self::StartingUp => "System starting up",
            Self::Emergency => "Emergency",
            Self::EmergencyBraking => "System halting",
            Self::SystemOn => "System is online",
            Self::MotorPowerOn => "Motors powered",
            Self::SystemMoving => "System moving",
        }
    }
}

/// Who may raise a safety event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Raisable from outside the supervisor (sequencer, signal handler).
    Public,
    /// Raisable only from input and level actions.
    Private,
}

/// Named transition trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SafetyEvent {
    /// Bring the system up.
    DoSystemOn = 0,
    /// Shutdown complete.
    Shutdown = 1,
    /// Both wheels halted.
    MotorsHalted = 2,
    /// Start-up complete.
    SystemStarted = 3,
    /// Operator cleared the emergency.
    ResetEmergency = 4,
    /// Power the motors.
    PowerOn = 5,
    /// Motion detected.
    StartMoving = 6,
    /// Remove motor power.
    PowerOff = 7,
    /// Motion settled.
    StopMoving = 8,
    /// Emergency stop requested.
    Emergency = 9,
    /// Abort everything and go offline.
    Abort = 10,
}

impl SafetyEvent {
    /// Visibility of the event.
    #[inline]
    pub const fn visibility(self) -> Visibility {
        match self {
            Self::Shutdown | Self::MotorsHalted | Self::SystemStarted | Self::ResetEmergency => {
                Visibility::Private
            }
            Self::DoSystemOn
            | Self::PowerOn
            | Self::StartMoving
            | Self::PowerOff
            | Self::StopMoving
            | Self::Emergency
            | Self::Abort => Visibility::Public,
        }
    }
}

/// Which guidance the control pipeline is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Pose-tracking planner driving the wheel-axis midpoint.
    #[default]
    Pose,
    /// TCP position controller driving a point ahead of the axle.
    Tcp,
    /// Single-joint position servo.
    Servo,
}

// ─── Tests ──────────────────────────────────────────────────────────
