//! Simulation driver implementation.
//!
//! `SimulationDriver` implements `HalDriver` on top of [`DiffDrivePlant`]
//! and [`IoSimulator`]. The simulated clock advances by exactly `dt` per
//! cycle, so runs are deterministic regardless of host timing. State lives
//! behind a `parking_lot::Mutex` shared with [`SimulationHandle`], which
//! tests and demos use to press buttons and watch LEDs and wheels.

use std::sync::Arc;
use std::time::Duration;

use diffbot_common::consts::WHEEL_COUNT;
use diffbot_common::hal::config::{HalConfig, MotorConfig};
use diffbot_common::hal::driver::{HalDriver, HalError};
use diffbot_common::hal::types::{DigitalInput, DigitalOutputs, HalCommands, HalStatus};
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use super::DRIVER_NAME;
use super::io::IoSimulator;
use super::physics::DiffDrivePlant;

#[derive(Debug, Default)]
struct SimState {
    plant: Option<DiffDrivePlant>,
    io: IoSimulator,
    time_ns: u64,
    voltages: [f64; WHEEL_COUNT],
}

/// Observer/operator access to a running simulation.
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimulationHandle {
    /// Hold a button down.
    pub fn press(&self, input: DigitalInput) {
        self.set_input(input, true);
    }

    /// Release a button.
    pub fn release(&self, input: DigitalInput) {
        self.set_input(input, false);
    }

    /// Set a button state now.
    pub fn set_input(&self, input: DigitalInput, value: bool) {
        self.state.lock().io.set_input(input, value);
    }

    /// Change a button at simulated time `at_ns`.
    pub fn schedule_input(&self, at_ns: u64, input: DigitalInput, value: bool) {
        self.state.lock().io.schedule(at_ns, input, value);
    }

    /// LED states of the last cycle.
    pub fn outputs(&self) -> DigitalOutputs {
        self.state.lock().io.outputs()
    }

    /// Wheel travel [m]; zero before `init`.
    pub fn wheel_positions(&self) -> [f64; WHEEL_COUNT] {
        self.state
            .lock()
            .plant
            .as_ref()
            .map_or([0.0; WHEEL_COUNT], DiffDrivePlant::positions)
    }

    /// Wheel velocities [m/s]; zero before `init`.
    pub fn wheel_velocities(&self) -> [f64; WHEEL_COUNT] {
        self.state
            .lock()
            .plant
            .as_ref()
            .map_or([0.0; WHEEL_COUNT], DiffDrivePlant::velocities)
    }

    /// Voltages applied in the last cycle [V].
    pub fn voltages(&self) -> [f64; WHEEL_COUNT] {
        self.state.lock().voltages
    }

    /// Simulated time [ns].
    pub fn elapsed_ns(&self) -> u64 {
        self.state.lock().time_ns
    }
}

/// Simulation driver implementing the HalDriver trait.
#[derive(Debug)]
pub struct SimulationDriver {
    state: Arc<Mutex<SimState>>,
}

impl SimulationDriver {
    /// Create an uninitialised simulation driver.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Handle sharing this driver's state.
    pub fn handle(&self) -> SimulationHandle {
        SimulationHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HalDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, config: &HalConfig, motor: &MotorConfig) -> Result<(), HalError> {
        config.validate().map_err(HalError::ConfigError)?;
        motor.validate().map_err(HalError::ConfigError)?;

        let mut state = self.state.lock();
        state.plant = Some(DiffDrivePlant::new(motor, &config.simulation));
        state.time_ns = 0;
        state.voltages = [0.0; WHEEL_COUNT];
        info!(
            substeps = config.simulation.substeps,
            damping = config.simulation.viscous_damping,
            effective_mass = ?config.simulation.effective_mass,
            "simulation driver initialised"
        );
        Ok(())
    }

    fn cycle(&mut self, commands: &HalCommands, dt: Duration) -> Result<HalStatus, HalError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let plant = state
            .plant
            .as_mut()
            .ok_or_else(|| HalError::CommunicationError("simulation not initialised".into()))?;

        let voltages = commands.voltages.map(|u| if u.is_finite() { u } else { 0.0 });
        plant.step(voltages, dt.as_secs_f64());
        let encoders = plant.positions();

        state.voltages = voltages;
        state.time_ns += dt.as_nanos() as u64;
        let inputs = state.io.cycle(commands.outputs, state.time_ns);
        trace!(t_ns = state.time_ns, ?voltages, ?encoders, "simulation cycle");

        Ok(HalStatus {
            timestamp_ns: state.time_ns,
            encoders,
            inputs,
        })
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        let mut state = self.state.lock();
        state.voltages = [0.0; WHEEL_COUNT];
        debug!(t_ns = state.time_ns, "simulation driver shut down");
        Ok(())
    }
}
