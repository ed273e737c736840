//! Safety level tables.
//!
//! Everything the supervisor does is data: the transition table, the
//! per-level input checks on the operator buttons and the per-level LED
//! actions. Level actions on the pipeline live in the supervisor.

use diffbot_common::control_unit::state::{SafetyEvent, SafetyLevel};
use diffbot_common::hal::types::{DigitalInput, DigitalOutput};
use static_assertions::const_assert_eq;

/// What to do with one button in one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Not evaluated.
    Ignore,
    /// Raise `event` whenever the button state differs from `expected`.
    Check {
        /// Button state that keeps the level.
        expected: bool,
        /// Event raised otherwise.
        event: SafetyEvent,
    },
}

/// What to do with one LED in one level, once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    /// Drive to a fixed state.
    Set(bool),
    /// Invert the current state (blink at half the cycle rate).
    Toggle,
}

/// Level reached from `level` on `event`, or `None` if the level has no such transition.
pub const fn transition(level: SafetyLevel, event: SafetyEvent) -> Option<SafetyLevel> {
    use SafetyEvent as E;
    use SafetyLevel as L;

    match (level, event) {
        (L::SystemOff, E::DoSystemOn) => Some(L::StartingUp),
        (L::ShuttingDown, E::Shutdown) => Some(L::SystemOff),
        (L::Braking, E::MotorsHalted) => Some(L::ShuttingDown),
        (L::StartingUp, E::SystemStarted) => Some(L::SystemOn),
        (L::Emergency, E::ResetEmergency) => Some(L::SystemOn),
        (L::EmergencyBraking, E::MotorsHalted) => Some(L::Emergency),
        (L::SystemOn, E::PowerOn) => Some(L::MotorPowerOn),
        (L::MotorPowerOn, E::StartMoving) => Some(L::SystemMoving),
        (L::MotorPowerOn, E::PowerOff) => Some(L::SystemOn),
        (L::SystemMoving, E::StopMoving) => Some(L::MotorPowerOn),
        (L::SystemMoving, E::Emergency) => Some(L::EmergencyBraking),
        (L::SystemMoving, E::Abort) => Some(L::Braking),
        (l, E::Abort) if l.is_between(L::Emergency, L::MotorPowerOn) => Some(L::ShuttingDown),
        (l, E::Emergency) if l.is_between(L::SystemOn, L::MotorPowerOn) => Some(L::Emergency),
        _ => None,
    }
}

/// Button checks for `level`.
///
/// `reset_expected` is the mode-button state that keeps an emergency latched.
pub const fn input_actions(
    level: SafetyLevel,
    reset_expected: bool,
) -> [(DigitalInput, InputAction); 2] {
    use SafetyLevel as L;

    let (pause, mode) = match level {
        L::SystemOn => (
            InputAction::Check {
                expected: false,
                event: SafetyEvent::PowerOn,
            },
            InputAction::Ignore,
        ),
        L::MotorPowerOn | L::SystemMoving => (
            InputAction::Ignore,
            InputAction::Check {
                expected: false,
                event: SafetyEvent::Emergency,
            },
        ),
        L::Emergency => (
            InputAction::Ignore,
            InputAction::Check {
                expected: reset_expected,
                event: SafetyEvent::ResetEmergency,
            },
        ),
        _ => (InputAction::Ignore, InputAction::Ignore),
    };
    [(DigitalInput::Pause, pause), (DigitalInput::Mode, mode)]
}

/// LED actions for `level`.
pub const fn output_actions(level: SafetyLevel) -> [(DigitalOutput, OutputAction); 2] {
    use OutputAction::{Set, Toggle};
    use SafetyLevel as L;

    let (green, red) = match level {
        L::SystemOff | L::ShuttingDown | L::Braking => (Set(false), Toggle),
        L::StartingUp => (Toggle, Set(false)),
        L::Emergency | L::EmergencyBraking => (Set(false), Set(true)),
        L::SystemOn => (Toggle, Toggle),
        L::MotorPowerOn | L::SystemMoving => (Set(true), Set(false)),
    };
    [(DigitalOutput::Green, green), (DigitalOutput::Red, red)]
}

const_assert_eq!(SafetyLevel::ALL.len(), 9);

// ─── Tests ──────────────────────────────────────────────────────────
