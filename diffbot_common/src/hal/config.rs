//! Hardware description: drive train and HAL driver selection.

use serde::{Deserialize, Serialize};

/// Maximum wheel force [N].
pub const MAX_FORCE_DEFAULT: f64 = 2.5;
/// Maximum wheel speed [m/s].
pub const MAX_VELOCITY_DEFAULT: f64 = 0.848;
/// Gear ratio over wheel radius, 3441/104 / 0.04 m [1/m].
pub const TRANSMISSION_DEFAULT: f64 = 3441.0 / 104.0 / 0.04;
/// Rotor inertia [kg·m²].
pub const ROTOR_INERTIA_DEFAULT: f64 = 6.8e-8;
/// Winding resistance [Ω].
pub const RESISTANCE_DEFAULT: f64 = 8.0;
/// Torque / back-EMF constant [N·m/A].
pub const TORQUE_CONSTANT_DEFAULT: f64 = 8.44e-3;

/// DC motor and transmission parameters, identical for both wheels.
///
/// # TOML Example
///
/// ```toml
/// [motor]
/// max_force = 2.5
/// max_velocity = 0.848
/// resistance = 8.0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Force clamp applied before the motor model [N].
    pub max_force: f64,
    /// Velocity clamp applied before the back-EMF term [m/s].
    pub max_velocity: f64,
    /// Transmission ratio i (gear ratio over wheel radius) [1/m].
    pub transmission: f64,
    /// Rotor inertia J [kg·m²].
    pub rotor_inertia: f64,
    /// Winding resistance R [Ω].
    pub resistance: f64,
    /// Motor constant kM [N·m/A].
    pub torque_constant: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            max_force: MAX_FORCE_DEFAULT,
            max_velocity: MAX_VELOCITY_DEFAULT,
            transmission: TRANSMISSION_DEFAULT,
            rotor_inertia: ROTOR_INERTIA_DEFAULT,
            resistance: RESISTANCE_DEFAULT,
            torque_constant: TORQUE_CONSTANT_DEFAULT,
        }
    }
}

impl MotorConfig {
    /// Rotor inertia reflected to the wheel, i²·J [kg].
    #[inline]
    pub fn reflected_inertia(&self) -> f64 {
        self.transmission * self.transmission * self.rotor_inertia
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("max_force", self.max_force),
            ("max_velocity", self.max_velocity),
            ("transmission", self.transmission),
            ("rotor_inertia", self.rotor_inertia),
            ("resistance", self.resistance),
            ("torque_constant", self.torque_constant),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("motor.{name} must be > 0, got {value}"));
            }
        }
        Ok(())
    }
}

/// Simulated plant parameters, per wheel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Effective mass seen by each wheel [kg]. `None` uses the reflected rotor inertia.
    pub effective_mass: Option<f64>,
    /// Viscous friction [N·s/m].
    pub viscous_damping: f64,
    /// Integration sub-steps per cycle.
    pub substeps: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            effective_mass: None,
            viscous_damping: 0.02,
            substeps: 10,
        }
    }
}

/// HAL section of the control unit configuration.
///
/// # TOML Example
///
/// ```toml
/// [hal]
/// driver = "simulation"
///
/// [hal.simulation]
/// viscous_damping = 0.02
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Registered driver name.
    pub driver: String,
    /// Plant parameters for the simulation driver.
    pub simulation: SimulationConfig,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            driver: "simulation".to_string(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl HalConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.driver.is_empty() {
            return Err("hal.driver cannot be empty".to_string());
        }
        if let Some(m) = self.simulation.effective_mass {
            if !(m.is_finite() && m > 0.0) {
                return Err(format!("hal.simulation.effective_mass must be > 0, got {m}"));
            }
        }
        let damping = self.simulation.viscous_damping;
        if damping.is_nan() || damping < 0.0 {
            return Err(format!(
                "hal.simulation.viscous_damping must be >= 0, got {damping}"
            ));
        }
        if self.simulation.substeps == 0 {
            return Err("hal.simulation.substeps must be >= 1".to_string());
        }
        Ok(())
    }
}
