// Value types shared by kinematics, odometry and telemetry
//
// Conventions: chassis frame is x forward, y left. Angles are radians,
// counter-clockwise positive. Headings are continuous (not wrapped).

use serde::{Deserialize, Serialize};

/// Number of swerve modules on the chassis
pub const MODULE_COUNT: usize = 4;

/// Module order used everywhere: forward mapping, desaturation, odometry, dispatch
pub const FRONT_LEFT: usize = 0;
pub const FRONT_RIGHT: usize = 1;
pub const BACK_LEFT: usize = 2;
pub const BACK_RIGHT: usize = 3;

/// Human readable module names, indexed like the module arrays
pub const MODULE_NAMES: [&str; MODULE_COUNT] = ["front_left", "front_right", "back_left", "back_right"];

/// Robot pose in the field frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,       // m
    pub y: f64,       // m
    pub heading: f64, // rad
}

impl Pose2D {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self { x, y, heading }
    }
}

/// Chassis-frame velocity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    pub vx: f64,    // m/s, forward
    pub vy: f64,    // m/s, left
    pub omega: f64, // rad/s, counter-clockwise
}

impl ChassisSpeeds {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Build chassis speeds from a field-frame velocity.
    ///
    /// The field vector is rotated by `-heading`, so with the robot facing
    /// +90° (field +y) a field command of (1, 0) becomes (0, -1) in the
    /// chassis frame.
    pub fn from_field_relative(vx: f64, vy: f64, omega: f64, heading: f64) -> Self {
        let (sin, cos) = heading.sin_cos();
        Self {
            vx: vx * cos + vy * sin,
            vy: -vx * sin + vy * cos,
            omega,
        }
    }
}

/// Chassis-frame displacement over one control interval
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    pub dx: f64,
    pub dy: f64,
    pub dtheta: f64,
}

/// Offset of a module from the chassis center
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleOffset {
    pub x: f64, // m
    pub y: f64, // m
}

impl ModuleOffset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from the chassis center
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Target (or measured) velocity of one module
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    pub speed: f64, // m/s
    pub angle: f64, // rad
}

impl ModuleState {
    pub fn new(speed: f64, angle: f64) -> Self {
        Self { speed, angle }
    }
}

/// Measured cumulative travel of one module
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModulePosition {
    pub distance: f64, // m
    pub angle: f64,    // rad
}

impl ModulePosition {
    pub fn new(distance: f64, angle: f64) -> Self {
        Self { distance, angle }
    }
}
