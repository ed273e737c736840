//! Controller parameterisation for the Control Unit.
//!
//! A controller is described either by its natural frequency or by the task
//! frequency it runs at. Both descriptions resolve to the same gains when
//! `omega0 = f / (2·s·D)`.

use serde::{Deserialize, Serialize};

/// How a joint controller's gains are specified.
///
/// # TOML Example
///
/// ```toml
/// [controller.gains]
/// kind = "from_task_frequency"
/// task_frequency = 200.0
/// damping = 0.7
/// safety_factor = 2.2
/// inertia = 0.0465
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerConfig {
    /// Gains from the closed-loop natural frequency.
    FromNaturalFrequency {
        /// Natural frequency ω0 [rad/s].
        omega0: f64,
        /// Damping ratio D.
        damping: f64,
        /// Reflected inertia M [kg].
        inertia: f64,
    },
    /// Gains from the task frequency and a safety factor.
    FromTaskFrequency {
        /// Task frequency f [Hz].
        task_frequency: f64,
        /// Damping ratio D.
        damping: f64,
        /// Safety factor s.
        safety_factor: f64,
        /// Reflected inertia M [kg].
        inertia: f64,
    },
}

/// Controller structure the gains are resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerForm {
    /// Position loop: torque = Kp·e + Kd·ė.
    PositionPd,
    /// Velocity loop: torque = M·(KP·e + KI·∫e).
    VelocityPi,
}

/// Gains after resolution, computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedGains {
    /// Position PD gains, already scaled by the inertia.
    Pd {
        /// Proportional gain [N/m].
        kp: f64,
        /// Derivative gain [N·s/m].
        kd: f64,
    },
    /// Velocity PI acceleration gains plus the inertia that scales them.
    Pi {
        /// Proportional gain [1/s].
        kp: f64,
        /// Integral gain [1/s²].
        ki: f64,
        /// Inertia [kg].
        inertia: f64,
    },
}

impl ControllerConfig {
    /// Damping ratio.
    #[inline]
    pub const fn damping(&self) -> f64 {
        match *self {
            Self::FromNaturalFrequency { damping, .. } | Self::FromTaskFrequency { damping, .. } => {
                damping
            }
        }
    }

    /// Reflected inertia.
    #[inline]
    pub const fn inertia(&self) -> f64 {
        match *self {
            Self::FromNaturalFrequency { inertia, .. } | Self::FromTaskFrequency { inertia, .. } => {
                inertia
            }
        }
    }

    /// Equivalent natural frequency ω0.
    #[inline]
    pub fn natural_frequency(&self) -> f64 {
        match *self {
            Self::FromNaturalFrequency { omega0, .. } => omega0,
            Self::FromTaskFrequency {
                task_frequency,
                damping,
                safety_factor,
                ..
            } => task_frequency / (2.0 * safety_factor * damping),
        }
    }

    /// Position PD gains `(Kp, Kd)`, scaled by the inertia.
    pub fn position_gains(&self) -> (f64, f64) {
        self.resolve_pd()
    }

    /// Velocity PI gains `(KP, KI, M)`.
    pub fn velocity_gains(&self) -> (f64, f64, f64) {
        self.resolve_pi()
    }

    /// Resolve the gains for a controller form.
    pub fn resolve(&self, form: ControllerForm) -> ResolvedGains {
        match form {
            ControllerForm::PositionPd => {
                let (kp, kd) = self.resolve_pd();
                ResolvedGains::Pd { kp, kd }
            }
            ControllerForm::VelocityPi => {
                let (kp, ki, inertia) = self.resolve_pi();
                ResolvedGains::Pi { kp, ki, inertia }
            }
        }
    }

    /// `Kp = ω0²·M`, `Kd = 2·D·ω0·M`.
    fn resolve_pd(&self) -> (f64, f64) {
        let (p, d) = match *self {
            Self::FromNaturalFrequency { omega0, damping, .. } => {
                (omega0 * omega0, 2.0 * damping * omega0)
            }
            Self::FromTaskFrequency {
                task_frequency: f,
                damping,
                safety_factor: s,
                ..
            } => {
                let w = f / 2.0 / s / damping;
                (w * w, f / s)
            }
        };
        let m = self.inertia();
        (p * m, d * m)
    }

    /// `KP = 2·D·ω0`, `KI = ω0²`, plus the inertia `M`.
    fn resolve_pi(&self) -> (f64, f64, f64) {
        let (p, i) = match *self {
            Self::FromNaturalFrequency { omega0, damping, .. } => {
                (2.0 * damping * omega0, omega0 * omega0)
            }
            Self::FromTaskFrequency {
                task_frequency: f,
                damping,
                safety_factor: s,
                ..
            } => {
                let w = f / 2.0 / s / damping;
                (f / s, w * w)
            }
        };
        (p, i, self.inertia())
    }

    /// Validate parameter signs.
    pub fn validate(&self) -> Result<(), String> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(format!("controller {name} must be > 0, got {v}"))
            }
        };
        match *self {
            Self::FromNaturalFrequency {
                omega0,
                damping,
                inertia,
            } => {
                positive("omega0", omega0)?;
                positive("damping", damping)?;
                positive("inertia", inertia)
            }
            Self::FromTaskFrequency {
                task_frequency,
                damping,
                safety_factor,
                inertia,
            } => {
                positive("task_frequency", task_frequency)?;
                positive("damping", damping)?;
                positive("safety_factor", safety_factor)?;
                positive("inertia", inertia)
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
