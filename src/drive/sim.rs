// Ideal simulated hardware, used when no real modules are attached
//
// Modules reach their setpoint instantly and integrate distance from the
// commanded speed. The gyro integrates whatever rate the drivetrain feeds it.

use super::drivetrain::{HeadingSensor, SwerveModule};
use super::geometry::{ModulePosition, ModuleState};

#[derive(Debug, Clone, Default)]
pub struct SimModule {
    desired: ModuleState,
    distance: f64,
}

impl SimModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last setpoint received
    pub fn desired(&self) -> ModuleState {
        self.desired
    }
}

impl SwerveModule for SimModule {
    fn set_desired_state(&mut self, state: ModuleState) {
        self.desired = state;
    }

    fn position(&self) -> ModulePosition {
        ModulePosition::new(self.distance, self.desired.angle)
    }

    fn state(&self) -> ModuleState {
        self.desired
    }

    fn reset_position(&mut self) {
        self.distance = 0.0;
    }

    fn simulation_periodic(&mut self, dt: f64) {
        self.distance += self.desired.speed * dt;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimGyro {
    heading: f64,
}

impl SimGyro {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HeadingSensor for SimGyro {
    fn heading(&self) -> f64 {
        self.heading
    }

    fn reset(&mut self) {
        self.heading = 0.0;
    }

    fn simulate(&mut self, omega: f64, dt: f64) {
        self.heading += omega * dt;
    }
}
