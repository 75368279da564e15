// Timeouts, topics, drivetrain limits and chassis geometry
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::drive::geometry::{MODULE_COUNT, ModuleOffset};

// Runtime loop frequency (20 ms control period)
pub const LOOP_HZ: u64 = 50;
pub const MAX_LOOP_HZ: u64 = 1000;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "swerve/cmd/drive"; // driver commands
pub const TOPIC_STATE_DRIVE: &str = "swerve/state/drive"; // telemetry
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status

// Drivetrain limits
pub const MAX_SPEED: f64 = 3.0; // m/s
pub const MAX_ANGULAR_SPEED: f64 = std::f64::consts::PI; // rad/s

/// Module offsets from chassis center (m), FL/FR/BL/BR
pub const DEFAULT_MODULE_OFFSETS: [ModuleOffset; MODULE_COUNT] = [
    ModuleOffset { x: 0.292, y: 0.267 },
    ModuleOffset { x: 0.292, y: -0.267 },
    ModuleOffset { x: -0.292, y: 0.267 },
    ModuleOffset { x: -0.292, y: -0.267 },
];

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime configuration, every field optional in the JSON file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub loop_hz: u64,
    pub cmd_timeout_ms: u64,
    pub max_speed: f64,
    pub max_angular_speed: f64,
    pub module_offsets: [ModuleOffset; MODULE_COUNT],
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            loop_hz: LOOP_HZ,
            cmd_timeout_ms: CMD_TIMEOUT.as_millis() as u64,
            max_speed: MAX_SPEED,
            max_angular_speed: MAX_ANGULAR_SPEED,
            module_offsets: DEFAULT_MODULE_OFFSETS,
        }
    }
}

impl DriveConfig {
    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_hz == 0 || self.loop_hz > MAX_LOOP_HZ {
            return Err(ConfigError::Invalid {
                field: "loop_hz",
                reason: format!("must be between 1 and {}, got {}", MAX_LOOP_HZ, self.loop_hz),
            });
        }
        for (field, value) in [
            ("max_speed", self.max_speed),
            ("max_angular_speed", self.max_angular_speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive and finite, got {}", value),
                });
            }
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.loop_hz)
    }

    pub fn cmd_timeout(&self) -> Duration {
        Duration::from_millis(self.cmd_timeout_ms)
    }
}
