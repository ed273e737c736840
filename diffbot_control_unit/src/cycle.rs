//! Fixed-rate control cycle: HAL → supervisor → pipeline → HAL.
//!
//! One cycle:
//! 1. `HalDriver::cycle` applies the previous commands and returns a fresh
//!    encoder/button sample.
//! 2. The safety supervisor runs for the current level and computes the LEDs.
//! 3. The control pipeline turns the sample into wheel voltages.
//! 4. Fault flags are evaluated; any CRITICAL flag raises Abort.
//!
//! ## RT Setup
//! With the `rt` feature: `mlockall`, stack prefault, CPU pinning and
//! `SCHED_FIFO`, then an absolute-time `clock_nanosleep` loop in which an
//! overrun raises Abort. Without it the loop paces with `std::thread::sleep`
//! and overruns are only logged.

use std::time::Duration;

use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::control_unit::error::FaultFlags;
use diffbot_common::hal::driver::{HalDriver, HalError};
use diffbot_common::hal::types::{HalCommands, HalStatus};
use tracing::{debug, info, warn};

use crate::control::pipeline::ControlPipeline;
use crate::error::propagation::{FaultCounters, evaluate_faults};
use crate::safety::supervisor::{SafetySupervisor, SupervisorHandle};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Timed cycles.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for the average.
    pub sum_cycle_ns: i64,
    /// Running sum of squares for the standard deviation.
    pub sum_sq_cycle_ns: i128,
    /// Cycles that exceeded the budget.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Zeroed statistics.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            sum_sq_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record one cycle.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.sum_sq_cycle_ns += i128::from(duration_ns) * i128::from(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns], 0 before the first cycle.
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }

    /// Population standard deviation of the cycle time [ns].
    pub fn stddev_cycle_ns(&self) -> f64 {
        if self.cycle_count == 0 {
            return 0.0;
        }
        let n = self.cycle_count as f64;
        let mean = self.sum_cycle_ns as f64 / n;
        let var = self.sum_sq_cycle_ns as f64 / n - mean * mean;
        var.max(0.0).sqrt()
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or runner construction.
#[derive(Debug)]
pub enum CycleError {
    /// RT system call failed.
    RtSetup(String),
    /// HAL driver failed to initialise.
    Hal(HalError),
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RtSetup(msg) => write!(f, "RT setup error: {msg}"),
            Self::Hal(e) => write!(f, "HAL error: {e}"),
        }
    }
}

impl std::error::Error for CycleError {}

impl From<HalError> for CycleError {
    fn from(e: HalError) -> Self {
        Self::Hal(e)
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Scheduling options for the cycle thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct RtOptions {
    /// Pin the thread to this core.
    pub cpu_core: Option<usize>,
    /// `SCHED_FIFO` priority.
    pub priority: Option<i32>,
}

/// Prepare the calling thread for the cycle loop.
///
/// No-op without the `rt` feature.
pub fn rt_setup(options: &RtOptions) -> Result<(), CycleError> {
    #[cfg(feature = "rt")]
    {
        use nix::sys::mman::{MlockallFlags, mlockall};

        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
            .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))?;
        prefault_stack();
        if let Some(cpu) = options.cpu_core {
            pin_to_core(cpu)?;
        }
        if let Some(priority) = options.priority {
            set_fifo(priority)?;
        }
        info!(?options, "RT setup complete");
    }
    #[cfg(not(feature = "rt"))]
    {
        debug!(?options, "simulation build, RT setup skipped");
    }
    Ok(())
}

#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xA5) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn pin_to_core(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut set = CpuSet::new();
    set.set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &set)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(feature = "rt")]
fn set_fifo(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the driver, supervisor and pipeline and runs them at a fixed rate.
pub struct CycleRunner<P: ControlPipeline> {
    driver: Box<dyn HalDriver>,
    supervisor: SafetySupervisor,
    pipeline: P,
    commands: HalCommands,
    last_status: HalStatus,
    stats: CycleStats,
    counters: FaultCounters,
    cycles: u64,
    cycle_time: Duration,
    dt: f64,
}

impl<P: ControlPipeline> CycleRunner<P> {
    /// Initialise `driver` and assemble the runner.
    pub fn new(
        config: &ControlUnitConfig,
        mut driver: Box<dyn HalDriver>,
        pipeline: P,
    ) -> Result<Self, CycleError> {
        driver.init(&config.hal, &config.motor)?;
        info!(
            driver = driver.name(),
            version = driver.version(),
            cycle_time_us = config.cycle.cycle_time_us,
            "HAL driver initialised"
        );
        Ok(Self {
            driver,
            supervisor: SafetySupervisor::new(&config.supervisor),
            pipeline,
            commands: HalCommands::default(),
            last_status: HalStatus::default(),
            stats: CycleStats::new(),
            counters: FaultCounters::default(),
            cycles: 0,
            cycle_time: Duration::from_micros(u64::from(config.cycle.cycle_time_us)),
            dt: config.cycle.dt(),
        })
    }

    /// Shared handle to the supervisor.
    pub fn supervisor_handle(&self) -> SupervisorHandle {
        self.supervisor.handle()
    }

    /// The supervisor.
    pub fn supervisor(&self) -> &SafetySupervisor {
        &self.supervisor
    }

    /// The pipeline.
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// The pipeline, mutably.
    pub fn pipeline_mut(&mut self) -> &mut P {
        &mut self.pipeline
    }

    /// Timing statistics of the paced loop.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Fault counters.
    pub fn counters(&self) -> &FaultCounters {
        &self.counters
    }

    /// Last HAL sample.
    pub fn last_status(&self) -> &HalStatus {
        &self.last_status
    }

    /// Commands sent with the next HAL cycle.
    pub fn commands(&self) -> &HalCommands {
        &self.commands
    }

    /// Cycles executed.
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Execute one cycle and return its fault flags.
    pub fn step(&mut self) -> FaultFlags {
        let mut flags = FaultFlags::empty();

        let status = match self.driver.cycle(&self.commands, self.cycle_time) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, cycle = self.cycles, "HAL cycle failed, reusing last sample");
                flags |= FaultFlags::HAL_FAULT;
                self.last_status
            }
        };

        let outputs = self.supervisor.run(&status.inputs, &mut self.pipeline);
        let voltages = self.pipeline.run(&status, self.dt);
        flags |= self.pipeline.faults();

        self.commands = HalCommands { voltages, outputs };
        self.last_status = status;
        self.cycles += 1;
        self.apply_faults(flags);
        flags
    }

    fn apply_faults(&mut self, flags: FaultFlags) {
        self.counters.record(flags);
        let result = evaluate_faults(flags);
        if result.abort_required {
            warn!(critical = ?result.critical, cycle = self.cycles, "critical fault, aborting");
            self.supervisor.handle().exit();
        }
    }

    /// Run without pacing until the supervisor asks to stop or `max_cycles` is reached.
    ///
    /// Returns the number of cycles executed by this call.
    pub fn run_unpaced(&mut self, max_cycles: u64) -> u64 {
        let handle = self.supervisor.handle();
        let start = self.cycles;
        while self.cycles - start < max_cycles && !handle.stop_requested() {
            self.step();
        }
        self.cycles - start
    }

    /// Run the paced loop until the supervisor asks to stop or `max_cycles` is reached.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<(), CycleError> {
        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(max_cycles)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(max_cycles);
            Ok(())
        }
    }

    fn finished(&self, handle: &SupervisorHandle, start: u64, max_cycles: Option<u64>) -> bool {
        handle.stop_requested() || max_cycles.is_some_and(|max| self.cycles - start >= max)
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, max_cycles: Option<u64>) -> Result<(), CycleError> {
        use nix::sys::time::TimeSpec;
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = |what: &str| {
            clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("{what}: {e}")))
        };
        let budget_ns = self.cycle_time.as_nanos() as i64;
        let period = TimeSpec::from_duration(self.cycle_time);
        let handle = self.supervisor.handle();
        let start = self.cycles;
        let mut next_wake = now("clock_gettime")?;

        while !self.finished(&handle, start, max_cycles) {
            next_wake = next_wake + period;

            let cycle_start = now("clock_gettime")?;
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();
            self.step();
            let duration_ns = timespec_diff_ns(&now("clock_gettime")?, &cycle_start);
            self.stats.record(duration_ns, latency_ns);

            if duration_ns > budget_ns {
                self.stats.overruns += 1;
                warn!(duration_ns, budget_ns, "cycle overrun");
                self.apply_faults(FaultFlags::CYCLE_OVERRUN);
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        self.log_summary();
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, max_cycles: Option<u64>) {
        use std::time::Instant;

        let budget_ns = self.cycle_time.as_nanos() as i64;
        let handle = self.supervisor.handle();
        let start = self.cycles;

        while !self.finished(&handle, start, max_cycles) {
            let cycle_start = Instant::now();
            self.step();
            let elapsed = cycle_start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns, 0);

            if duration_ns > budget_ns {
                self.stats.overruns += 1;
                warn!(duration_ns, budget_ns, "cycle overrun (simulation, not aborting)");
            }

            if let Some(remaining) = self.cycle_time.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        self.log_summary();
    }

    fn log_summary(&self) {
        info!(
            cycles = self.cycles,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            torque_saturated = self.counters.torque_saturated,
            critical = self.counters.critical_total(),
            "cycle loop finished"
        );
    }

    /// Shut the driver down. Voltages are not sent again afterwards.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.driver.shutdown() {
            warn!(error = %e, "HAL shutdown failed");
        }
        debug!(driver = self.driver.name(), "HAL driver shut down");
    }
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::pipeline::ControlSystem;
    use diffbot_common::control_unit::state::{SafetyEvent, SafetyLevel};
    use diffbot_common::hal::config::{HalConfig, MotorConfig};

    /// Plant that never moves; can be told to fail.
    struct StillDriver {
        fail_from: Option<u64>,
        cycles: u64,
    }

    impl StillDriver {
        fn boxed(fail_from: Option<u64>) -> Box<dyn HalDriver> {
            Box::new(Self {
                fail_from,
                cycles: 0,
            })
        }
    }

    impl HalDriver for StillDriver {
        fn name(&self) -> &'static str {
            "still"
        }
        fn version(&self) -> &'static str {
            "0.0.0"
        }
        fn init(&mut self, _config: &HalConfig, _motor: &MotorConfig) -> Result<(), HalError> {
            Ok(())
        }
        fn cycle(&mut self, _commands: &HalCommands, dt: Duration) -> Result<HalStatus, HalError> {
            self.cycles += 1;
            if self.fail_from.is_some_and(|n| self.cycles >= n) {
                return Err(HalError::CommunicationError("link down".into()));
            }
            Ok(HalStatus {
                timestamp_ns: self.cycles * dt.as_nanos() as u64,
                ..Default::default()
            })
        }
        fn shutdown(&mut self) -> Result<(), HalError> {
            Ok(())
        }
    }

    struct FailingInit;

    impl HalDriver for FailingInit {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn version(&self) -> &'static str {
            "0.0.0"
        }
        fn init(&mut self, _config: &HalConfig, _motor: &MotorConfig) -> Result<(), HalError> {
            Err(HalError::InitFailed("no hardware".into()))
        }
        fn cycle(&mut self, _commands: &HalCommands, _dt: Duration) -> Result<HalStatus, HalError> {
            unreachable!()
        }
        fn shutdown(&mut self) -> Result<(), HalError> {
            Ok(())
        }
    }

    fn runner(driver: Box<dyn HalDriver>) -> CycleRunner<ControlSystem> {
        let cfg = ControlUnitConfig::default();
        CycleRunner::new(&cfg, driver, ControlSystem::pose_tracking(&cfg)).unwrap()
    }

    #[test]
    fn cycle_stats_basic() {
        let mut stats = CycleStats::new();
        assert_eq!(stats.avg_cycle_ns(), 0);

        stats.record(500_000, 1_000);
        stats.record(600_000, 500);
        assert_eq!(stats.cycle_count, 2);
        assert_eq!(stats.min_cycle_ns, 500_000);
        assert_eq!(stats.max_cycle_ns, 600_000);
        assert_eq!(stats.max_latency_ns, 1_000);
        assert_eq!(stats.avg_cycle_ns(), 550_000);
        assert!((stats.stddev_cycle_ns() - 50_000.0).abs() < 1e-6);
    }

    #[test]
    fn init_failure_is_reported() {
        let cfg = ControlUnitConfig::default();
        let r = CycleRunner::new(&cfg, Box::new(FailingInit), ControlSystem::pose_tracking(&cfg));
        assert!(matches!(r, Err(CycleError::Hal(HalError::InitFailed(_)))));
    }

    #[test]
    fn first_cycle_brings_system_on() {
        let mut r = runner(StillDriver::boxed(None));
        r.supervisor_handle().trigger(SafetyEvent::DoSystemOn);
        let flags = r.step();
        assert!(flags.is_empty());
        assert_eq!(r.supervisor().level(), SafetyLevel::SystemOn);
        assert!(r.pipeline().is_running());
        assert_eq!(r.cycles(), 1);
    }

    #[test]
    fn stops_once_system_off_is_reached() {
        let mut r = runner(StillDriver::boxed(None));
        let h = r.supervisor_handle();
        h.trigger(SafetyEvent::DoSystemOn);
        r.step();
        h.exit();
        // ShuttingDown → SystemOff → stop request.
        let n = r.run_unpaced(100);
        assert_eq!(n, 2);
        assert!(h.stop_requested());
        assert_eq!(h.level(), SafetyLevel::SystemOff);
        assert_eq!(r.commands().voltages, [0.0, 0.0]);
    }

    #[test]
    fn hal_failure_aborts_gracefully() {
        let mut r = runner(StillDriver::boxed(Some(3)));
        let h = r.supervisor_handle();
        h.trigger(SafetyEvent::DoSystemOn);
        r.step();
        r.step();
        assert_eq!(h.level(), SafetyLevel::SystemOn);

        let flags = r.step();
        assert!(flags.contains(FaultFlags::HAL_FAULT));
        assert_eq!(h.level(), SafetyLevel::ShuttingDown);
        r.run_unpaced(10);
        assert!(h.stop_requested());
        assert!(r.counters().hal_faults >= 1);
    }

    #[test]
    fn max_cycles_bounds_the_paced_loop() {
        let mut cfg = ControlUnitConfig::default();
        cfg.cycle.cycle_time_us = 1_000;
        let mut r =
            CycleRunner::new(&cfg, StillDriver::boxed(None), ControlSystem::pose_tracking(&cfg))
                .unwrap();
        r.supervisor_handle().trigger(SafetyEvent::DoSystemOn);
        r.run(Some(5)).unwrap();
        assert_eq!(r.cycles(), 5);
        assert_eq!(r.stats().cycle_count, 5);
        r.shutdown();
    }
}
