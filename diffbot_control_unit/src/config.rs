//! TOML configuration loading with validation.
//!
//! Parses `diffbot.toml` into [`ControlUnitConfig`] through the shared
//! [`ConfigLoader`], then validates every section plus the cross-section
//! rules that only make sense once the whole file is known.

use std::path::Path;

use diffbot_common::config::{ConfigError as LoaderError, ConfigLoader, LogLevel};
use diffbot_common::consts::DEFAULT_CYCLE_TIME_US;
use diffbot_common::control_unit::config::ControlUnitConfig;
use tracing::{Level, warn};

/// Cycle time the default estimator matrices were discretised for [µs].
pub const ESTIMATOR_CYCLE_TIME_US: u32 = 1_000;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug)]
pub enum ConfigError {
    /// File I/O error.
    IoError(String),
    /// TOML parse error.
    ParseError(String),
    /// Parameter validation error.
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "config I/O error: {e}"),
            Self::ParseError(e) => write!(f, "config parse error: {e}"),
            Self::ValidationError(e) => write!(f, "config validation: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<LoaderError> for ConfigError {
    fn from(e: LoaderError) -> Self {
        match e {
            LoaderError::FileNotFound => Self::IoError(e.to_string()),
            LoaderError::ParseError(msg) => Self::ParseError(msg),
            LoaderError::ValidationError(msg) => Self::ValidationError(msg),
        }
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate `path`.
pub fn load_config(path: &Path) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::load(path).map_err(|e| match e {
        LoaderError::FileNotFound => {
            ConfigError::IoError(format!("{} not found", path.display()))
        }
        other => other.into(),
    })?;
    validate(&config)?;
    Ok(config)
}

/// Parse and validate an in-memory TOML document.
pub fn load_config_from_str(content: &str) -> Result<ControlUnitConfig, ConfigError> {
    let config = ControlUnitConfig::from_toml_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Validate all sections and the cross-section rules.
///
/// Call again after CLI overrides (e.g. `--variant`).
pub fn validate(config: &ControlUnitConfig) -> Result<(), ConfigError> {
    config.validate().map_err(ConfigError::ValidationError)?;

    if config.servo.max_force > config.motor.max_force {
        return Err(ConfigError::ValidationError(format!(
            "servo.max_force ({}) exceeds motor.max_force ({})",
            config.servo.max_force, config.motor.max_force
        )));
    }

    if config.estimator.enabled && config.cycle.cycle_time_us != ESTIMATOR_CYCLE_TIME_US {
        warn!(
            cycle_time_us = config.cycle.cycle_time_us,
            expected_us = ESTIMATOR_CYCLE_TIME_US,
            "estimator matrices were discretised for a different cycle time"
        );
    }
    if config.cycle.cycle_time_us != DEFAULT_CYCLE_TIME_US {
        warn!(
            cycle_time_us = config.cycle.cycle_time_us,
            "non-default cycle time; controller gains assume {DEFAULT_CYCLE_TIME_US} µs"
        );
    }
    Ok(())
}

/// Tracing level for `[shared] log_level`.
pub const fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
