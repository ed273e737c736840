//! # Diffbot Control Unit
//!
//! Fixed-rate motion control loop for a differential-drive robot.
//!
//! Loads `diffbot.toml`, builds the pipeline variant (pose tracking, TCP or
//! servo), creates the configured HAL driver, starts the motion sequence on
//! its own thread and runs the cycle loop until the safety supervisor
//! reaches `SystemOff` (Ctrl-C raises Abort) or `--cycles` is exhausted.

use clap::{Parser, ValueEnum};
use diffbot_common::control_unit::state::{PipelineVariant, SafetyEvent};
use diffbot_common::control_unit::config::ControlUnitConfig;
use diffbot_common::hal::driver::HalDriver;
use diffbot_control_unit::config::{ConfigError, load_config, tracing_level, validate};
use diffbot_control_unit::control::pipeline::{ControlPipeline, ControlSystem};
use diffbot_control_unit::control::servo::ServoControlSystem;
use diffbot_control_unit::cycle::{CycleRunner, RtOptions, rt_setup};
use diffbot_control_unit::sequence::{
    SequenceError, SequenceFile, Sequencer, default_steps, load_sequence,
};
use diffbot_hal::DriverRegistry;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Pipeline variant selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Pose,
    Tcp,
    Servo,
}

impl From<VariantArg> for PipelineVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Pose => Self::Pose,
            VariantArg::Tcp => Self::Tcp,
            VariantArg::Servo => Self::Servo,
        }
    }
}

/// Diffbot Control Unit — differential-drive motion control loop
#[derive(Parser, Debug)]
#[command(name = "diffbot_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Fixed-rate motion control with safety supervisor for a differential-drive robot")]
struct Args {
    /// Path to the configuration TOML.
    #[arg(short, long, default_value = "config/diffbot.toml")]
    config: PathBuf,

    /// Override `[cycle] variant`.
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// Motion sequence TOML (default: built-in sequence for the variant).
    #[arg(long, value_name = "FILE")]
    sequence: Option<PathBuf>,

    /// Do not start a motion sequence.
    #[arg(long)]
    no_sequence: bool,

    /// Power the motors without waiting for the pause button.
    #[arg(long)]
    auto_power_on: bool,

    /// CPU core to pin the cycle thread to (rt builds).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt builds).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level, overrides `[shared] log_level`).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args.config);
    let default_level = config
        .as_ref()
        .map_or(Level::INFO, |c| tracing_level(c.shared.log_level));
    setup_tracing(&args, default_level);

    info!("Diffbot Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Diffbot Control Unit shutdown complete");
}

fn run(
    args: &Args,
    config: Result<ControlUnitConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config?;
    if let Some(variant) = args.variant {
        config.cycle.variant = variant.into();
    }
    // Re-validated with the subscriber installed so warnings reach the log.
    validate(&config)?;
    info!(
        "Config OK: service={}, cycle_time={}µs, variant={:?}, driver={}",
        config.shared.service_name,
        config.cycle.cycle_time_us,
        config.cycle.variant,
        config.hal.driver
    );

    rt_setup(&RtOptions {
        cpu_core: Some(args.cpu_core),
        priority: Some(args.rt_priority),
    })?;

    let registry = DriverRegistry::with_builtin_drivers();
    let driver = registry.create_driver(&config.hal.driver)?;

    match config.cycle.variant {
        PipelineVariant::Pose => execute(args, &config, driver, ControlSystem::pose_tracking(&config)),
        PipelineVariant::Tcp => execute(args, &config, driver, ControlSystem::tcp(&config)),
        PipelineVariant::Servo => execute(args, &config, driver, ServoControlSystem::new(&config)),
    }
}

fn execute<P: ControlPipeline>(
    args: &Args,
    config: &ControlUnitConfig,
    driver: Box<dyn HalDriver>,
    pipeline: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let targets = pipeline.targets();
    let mut runner = CycleRunner::new(config, driver, pipeline)?;
    let supervisor = runner.supervisor_handle();

    // Ctrl-C brakes, shuts down and lets the loop reach SystemOff.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let supervisor = supervisor.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
            supervisor.exit();
        })?;
    }

    let sequence_thread = if args.no_sequence {
        None
    } else {
        let file = match &args.sequence {
            Some(path) => load_sequence(path)?,
            None => SequenceFile {
                repeat: true,
                steps: default_steps(config.cycle.variant),
            },
        };
        let sequencer = Sequencer::new(supervisor.clone(), targets, Arc::clone(&running))
            .with_auto_power_on(args.auto_power_on);
        Some(sequencer.spawn(file.steps, file.repeat)?)
    };

    supervisor.trigger(SafetyEvent::DoSystemOn);
    info!("CycleRunner initialized, entering cycle loop");
    let result = runner.run(args.cycles);

    running.store(false, Ordering::SeqCst);
    runner.shutdown();

    if let Some(thread) = sequence_thread {
        match thread.join() {
            Ok(Ok(())) | Ok(Err(SequenceError::Stopped)) => {}
            Ok(Err(e)) => warn!("Sequence ended with error: {e}"),
            Err(_) => warn!("Sequence thread panicked"),
        }
    }

    result?;
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, default_level: Level) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        default_level
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
