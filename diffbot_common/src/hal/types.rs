//! HAL command and status types.
//!
//! - `HalCommands` - Commands from the Control Unit to the HAL
//! - `HalStatus` - Status from the HAL to the Control Unit
//! - `DigitalInputs` / `DigitalOutputs` - Operator buttons and status LEDs

use crate::consts::WHEEL_COUNT;
use static_assertions::const_assert_eq;

/// Operator push buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalInput {
    /// On-board pause button.
    Pause,
    /// On-board mode button.
    Mode,
}

/// Status LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalOutput {
    /// Green LED.
    Green,
    /// Red LED.
    Red,
}

/// Sampled button states (`true` = pressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitalInputs {
    /// Pause button.
    pub pause: bool,
    /// Mode button.
    pub mode: bool,
}

impl DigitalInputs {
    /// Read one input.
    #[inline]
    pub const fn get(&self, input: DigitalInput) -> bool {
        match input {
            DigitalInput::Pause => self.pause,
            DigitalInput::Mode => self.mode,
        }
    }

    /// Write one input.
    #[inline]
    pub fn set(&mut self, input: DigitalInput, value: bool) {
        match input {
            DigitalInput::Pause => self.pause = value,
            DigitalInput::Mode => self.mode = value,
        }
    }
}

/// LED states (`true` = lit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitalOutputs {
    /// Green LED.
    pub green: bool,
    /// Red LED.
    pub red: bool,
}

impl DigitalOutputs {
    /// Read one output.
    #[inline]
    pub const fn get(&self, output: DigitalOutput) -> bool {
        match output {
            DigitalOutput::Green => self.green,
            DigitalOutput::Red => self.red,
        }
    }

    /// Write one output.
    #[inline]
    pub fn set(&mut self, output: DigitalOutput, value: bool) {
        match output {
            DigitalOutput::Green => self.green = value,
            DigitalOutput::Red => self.red = value,
        }
    }
}

/// Commands passed to the driver each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HalCommands {
    /// Motor voltages [V], `[left, right]`.
    pub voltages: [f64; WHEEL_COUNT],
    /// LED states.
    pub outputs: DigitalOutputs,
}

/// Status returned by the driver each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HalStatus {
    /// Sample timestamp [ns] since driver init.
    pub timestamp_ns: u64,
    /// Encoder positions (wheel travel) [m], `[left, right]`.
    pub encoders: [f64; WHEEL_COUNT],
    /// Button states.
    pub inputs: DigitalInputs,
}

const_assert_eq!(core::mem::size_of::<[f64; WHEEL_COUNT]>(), 16);
