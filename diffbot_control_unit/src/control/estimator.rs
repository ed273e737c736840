//! Per-joint linear Kalman filter.
//!
//! State `x = [position, velocity, current, disturbance]`, scalar encoder
//! measurement, scalar voltage input. Correct runs before the control
//! computation, predict after the motor command is known:
//!
//! ```text
//! correct:  K = P·Cᵀ / (C·P·Cᵀ + R),  x += K·(y − C·x),  P = (I − K·C)·P
//! predict:  x = Ad·x + Bd·u,          P = Ad·P·Adᵀ + Gd·Q·Gdᵀ
//! ```

use diffbot_common::control_unit::config::EstimatorConfig;
use nalgebra::{Matrix4, RowVector4, Vector4};

/// Estimated joint position and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointEstimate {
    /// Position [m].
    pub position: f64,
    /// Velocity [m/s].
    pub velocity: f64,
    /// The filter was re-seeded from the measurement this cycle.
    pub reset: bool,
}

/// Fixed-gain-structure Kalman estimator for one joint.
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    ad: Matrix4<f64>,
    bd: Vector4<f64>,
    c: RowVector4<f64>,
    qd: Matrix4<f64>,
    r: f64,
    p0: f64,
    x: Vector4<f64>,
    p: Matrix4<f64>,
    seeded: bool,
}

impl KalmanEstimator {
    /// Build from the `[estimator]` section (row-major matrices).
    pub fn new(config: &EstimatorConfig) -> Self {
        let ad = Matrix4::from_fn(|r, c| config.transition[r][c]);
        let bd = Vector4::from_column_slice(&config.input);
        let c = RowVector4::from_row_slice(&config.output);
        let gd = Vector4::from_column_slice(&config.noise_input);
        let qd = gd * config.process_noise * gd.transpose();
        Self {
            ad,
            bd,
            c,
            qd,
            r: config.measurement_noise,
            p0: config.initial_covariance,
            x: Vector4::zeros(),
            p: Matrix4::identity() * config.initial_covariance,
            seeded: false,
        }
    }

    /// Current state vector.
    #[inline]
    pub fn state(&self) -> Vector4<f64> {
        self.x
    }

    /// Re-seed the filter at `position` with zero velocity.
    pub fn reset(&mut self, position: f64) {
        self.x = Vector4::new(position, 0.0, 0.0, 0.0);
        self.p = Matrix4::identity() * self.p0;
        self.seeded = true;
    }

    /// Measurement update with encoder position `y`.
    ///
    /// The first call seeds the state from `y`. A non-finite state is
    /// re-seeded from `y`; a non-finite `y` skips the update.
    pub fn correct(&mut self, y: f64) -> JointEstimate {
        let mut reset = false;
        if y.is_finite() {
            let healthy = self.x.iter().all(|v| v.is_finite()) && self.p.iter().all(|v| v.is_finite());
            if !self.seeded || !healthy {
                reset = self.seeded;
                self.reset(y);
            } else {
                let pct = self.p * self.c.transpose();
                let innovation_var = (self.c * pct)[(0, 0)] + self.r;
                let gain = pct / innovation_var;
                let residual = y - (self.c * self.x)[(0, 0)];
                self.x += gain * residual;
                self.p = (Matrix4::identity() - gain * self.c) * self.p;
            }
        }

        JointEstimate {
            position: self.x[0],
            velocity: self.x[1],
            reset,
        }
    }

    /// Time update with the voltage `u` applied this cycle.
    pub fn predict(&mut self, u: f64) {
        if !self.seeded {
            return;
        }
        self.x = self.ad * self.x + self.bd * u;
        self.p = self.ad * self.p * self.ad.transpose() + self.qd;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_correction_seeds_from_measurement() {
        let mut k = KalmanEstimator::new(&EstimatorConfig::default());
        let e = k.correct(0.25);
        assert_eq!(e.position, 0.25);
        assert_eq!(e.velocity, 0.0);
        assert!(!e.reset);
    }

    #[test]
    fn follows_the_model_it_was_built_from() {
        let cfg = EstimatorConfig::default();
        let mut k = KalmanEstimator::new(&cfg);
        let ad = Matrix4::from_fn(|r, c| cfg.transition[r][c]);
        let bd = Vector4::from_column_slice(&cfg.input);

        let mut truth = Vector4::<f64>::zeros();
        for _ in 0..500 {
            let e = k.correct(truth[0]);
            assert!((e.position - truth[0]).abs() < 1e-9);
            assert!((e.velocity - truth[1]).abs() < 1e-6);
            k.predict(1.0);
            truth = ad * truth + bd * 1.0;
        }
        assert!(truth[1] > 0.0);
    }

    #[test]
    fn stationary_measurements_settle_velocity() {
        let mut k = KalmanEstimator::new(&EstimatorConfig::default());
        for _ in 0..2_000 {
            k.correct(0.1);
            k.predict(0.0);
        }
        let e = k.correct(0.1);
        assert!((e.position - 0.1).abs() < 1e-6);
        assert!(e.velocity.abs() < 1e-3);
    }

    #[test]
    fn non_finite_state_is_reseeded() {
        let mut k = KalmanEstimator::new(&EstimatorConfig::default());
        k.correct(0.0);
        k.predict(f64::NAN);
        let e = k.correct(0.3);
        assert!(e.reset);
        assert_eq!(e.position, 0.3);
        assert!(k.state().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn non_finite_measurement_is_skipped() {
        let mut k = KalmanEstimator::new(&EstimatorConfig::default());
        k.correct(0.2);
        let e = k.correct(f64::NAN);
        assert_eq!(e.position, 0.2);
        assert!(!e.reset);
    }
}
