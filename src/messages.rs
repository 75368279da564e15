// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::drive::geometry::{MODULE_COUNT, Pose2D};

// Command from teleop/scripts -> runtime
// Speed components are normalised to [-1, 1] and scaled by the configured maxima
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveCommand {
    pub x_speed: f64,
    pub y_speed: f64,
    pub z_rotation: f64,
    #[serde(default)]
    pub field_relative: bool,
}

impl DriveCommand {
    pub fn new(x_speed: f64, y_speed: f64, z_rotation: f64, field_relative: bool) -> Self {
        Self {
            x_speed,
            y_speed,
            z_rotation,
            field_relative,
        }
    }

    /// Zero command used when the watchdog fires
    pub fn stop() -> Self {
        Self::default()
    }
}

/// Per-module readout
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleTelemetry {
    pub drive_speed: f64,     // measured, m/s
    pub turn_position: f64,   // measured steering angle, rad
    pub commanded_angle: f64, // last computed wheel angle, rad
}

// Telemetry output from runtime -> monitoring
// Read-only, nothing here feeds back into control
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveTelemetry {
    pub modules: [ModuleTelemetry; MODULE_COUNT],
    pub heading: f64,
    pub pose: Pose2D,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
