//! Per-stage micro-benchmark.
//!
//! Measures single stages of the pipeline in isolation:
//! - velocity PI
//! - position PD (servo)
//! - pursuit law
//! - Kalman correct + predict

use criterion::{Criterion, criterion_group, criterion_main};

use diffbot_common::control_unit::config::{ControlUnitConfig, EstimatorConfig};
use diffbot_common::motion::{Pose, TargetPose};
use diffbot_control_unit::control::controller::{PositionController, VelocityController};
use diffbot_control_unit::control::estimator::KalmanEstimator;
use diffbot_control_unit::control::planner::pursuit_law;

const DT: f64 = 0.005; // 200 Hz

fn bench_velocity_controller(c: &mut Criterion) {
    let config = ControlUnitConfig::default();
    let mut controller = VelocityController::new(&config.controller);
    controller.set_enabled(true);
    let mut cycle = 0u64;

    c.bench_function("velocity_pi", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * DT;
            controller.run(0.2, 0.2 + 0.01 * t.sin(), DT)
        });
    });
}

fn bench_position_controller(c: &mut Criterion) {
    let config = ControlUnitConfig::default();
    let mut controller = PositionController::new(&config.servo.gains);
    controller.set_enabled(true);
    let mut cycle = 0u64;

    c.bench_function("position_pd", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * DT;
            controller.run(0.05, 0.05 * t.sin(), 0.05 * t.cos(), DT)
        });
    });
}

fn bench_pursuit_law(c: &mut Criterion) {
    let config = ControlUnitConfig::default();
    let target = TargetPose::new(0.5, 0.2, 0.0);
    let mut cycle = 0u64;

    c.bench_function("pursuit_law", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * DT;
            let pose = Pose::new(0.1 * t.cos(), 0.1 * t.sin(), t % 3.0);
            pursuit_law(&config.planner, &pose, &target)
        });
    });
}

fn bench_estimator(c: &mut Criterion) {
    let mut estimator = KalmanEstimator::new(&EstimatorConfig::default());
    let mut cycle = 0u64;

    c.bench_function("kalman_correct_predict", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * 0.001;
            let estimate = estimator.correct(0.01 * t.sin());
            estimator.predict(0.1 * t.cos());
            estimate
        });
    });
}

criterion_group!(
    benches,
    bench_velocity_controller,
    bench_position_controller,
    bench_pursuit_law,
    bench_estimator,
);
criterion_main!(benches);
