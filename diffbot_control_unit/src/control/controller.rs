//! Joint controllers with gains resolved once at construction.
//!
//! - [`VelocityController`]: PI on wheel velocity, integrator hard-clamped to ±e_limit.
//! - [`PositionController`]: PD on joint position, derivative by discrete differencing.
//!
//! Both output a force command [N]; clamping to the actuator limit happens in
//! the motor model.

use diffbot_common::control_unit::config::VelocityControllerConfig;
use diffbot_common::control_unit::control::ControllerConfig;

/// Controller output for one joint and one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerOutput {
    /// Force command [N].
    pub torque: f64,
    /// Velocity the error was computed from, passed on to the motor model [m/s].
    pub velocity: f64,
    /// Velocity (or position) error of this cycle.
    pub error: f64,
}

/// Velocity PI controller: `torque = M·(KP·e + KI·∫e)`.
#[derive(Debug, Clone)]
pub struct VelocityController {
    kp: f64,
    ki: f64,
    inertia: f64,
    integrator: f64,
    integrator_limit: f64,
    limit_enabled: bool,
    enabled: bool,
}

impl VelocityController {
    /// Build from the `[controller]` section. Starts disabled.
    pub fn new(config: &VelocityControllerConfig) -> Self {
        let (kp, ki, inertia) = config.gains.velocity_gains();
        Self {
            kp,
            ki,
            inertia,
            integrator: 0.0,
            integrator_limit: config.integrator_limit,
            limit_enabled: config.limit_enabled,
            enabled: false,
        }
    }

    /// Enable or disable. Disabling resets the integrator.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Whether the controller is enabled.
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch the integrator clamp on or off.
    #[inline]
    pub fn set_limit_enabled(&mut self, enabled: bool) {
        self.limit_enabled = enabled;
    }

    /// Current integrator value ∫e dt [m].
    #[inline]
    pub const fn integrator(&self) -> f64 {
        self.integrator
    }

    /// Resolved `(KP, KI, M)`.
    #[inline]
    pub const fn gains(&self) -> (f64, f64, f64) {
        (self.kp, self.ki, self.inertia)
    }

    /// Zero the integrator.
    #[inline]
    pub fn reset(&mut self) {
        self.integrator = 0.0;
    }

    /// One controller cycle.
    ///
    /// Disabled or `dt <= 0` → zero torque; the error is still reported.
    #[inline]
    pub fn run(&mut self, reference: f64, measured: f64, dt: f64) -> ControllerOutput {
        let error = reference - measured;
        if !self.enabled || dt <= 0.0 {
            return ControllerOutput {
                torque: 0.0,
                velocity: measured,
                error,
            };
        }

        self.integrator += error * dt;
        if self.limit_enabled {
            self.integrator = self
                .integrator
                .clamp(-self.integrator_limit, self.integrator_limit);
        }

        ControllerOutput {
            torque: self.inertia * (self.kp * error + self.ki * self.integrator),
            velocity: measured,
            error,
        }
    }
}

/// Position PD controller: `torque = Kp·e + Kd·ė`.
#[derive(Debug, Clone)]
pub struct PositionController {
    kp: f64,
    kd: f64,
    prev_error: Option<f64>,
    enabled: bool,
}

impl PositionController {
    /// Build from a gain parameterisation. Starts disabled.
    pub fn new(gains: &ControllerConfig) -> Self {
        let (kp, kd) = gains.position_gains();
        Self {
            kp,
            kd,
            prev_error: None,
            enabled: false,
        }
    }

    /// Enable or disable. Disabling forgets the previous error.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    /// Whether the controller is enabled.
    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolved `(Kp, Kd)`.
    #[inline]
    pub const fn gains(&self) -> (f64, f64) {
        (self.kp, self.kd)
    }

    /// Forget the previous error; the next cycle uses ė = 0.
    #[inline]
    pub fn reset(&mut self) {
        self.prev_error = None;
    }

    /// One controller cycle for `setpoint` vs `position`, forwarding `velocity`.
    #[inline]
    pub fn run(&mut self, setpoint: f64, position: f64, velocity: f64, dt: f64) -> ControllerOutput {
        let error = setpoint - position;
        if !self.enabled || dt <= 0.0 {
            return ControllerOutput {
                torque: 0.0,
                velocity,
                error,
            };
        }

        let error_rate = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        self.prev_error = Some(error);

        ControllerOutput {
            torque: self.kp * error + self.kd * error_rate,
            velocity,
            error,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
