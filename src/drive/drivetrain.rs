// High-level swerve drivetrain
//
// Owns the four module handles, the heading sensor, kinematics and odometry,
// and exposes one call per half of the control cycle:
// - periodic(): read positions + heading, update odometry
// - drive(): command -> module states -> modules

use tracing::{debug, info};

use super::geometry::{
    ChassisSpeeds, MODULE_COUNT, MODULE_NAMES, ModulePosition, ModuleState, Pose2D,
};
use super::kinematics::{KinematicsError, SwerveKinematics};
use super::odometry::SwerveOdometry;
use crate::config::{ConfigError, DriveConfig};
use crate::messages::{DriveCommand, DriveTelemetry, ModuleTelemetry};

/// Actuation contract for one swerve module
///
/// Implementations own closed-loop drive/steer control and encoders. Reads
/// must return cached values without blocking.
pub trait SwerveModule {
    fn set_desired_state(&mut self, state: ModuleState);

    /// Cumulative drive distance and current steering angle
    fn position(&self) -> ModulePosition;

    /// Measured drive speed and steering angle
    fn state(&self) -> ModuleState;

    fn reset_position(&mut self);

    /// Advance simulated hardware by `dt` seconds. Real modules ignore it.
    fn simulation_periodic(&mut self, _dt: f64) {}
}

/// Heading sensor contract
///
/// `heading` is continuous (not wrapped to ±π), counter-clockwise positive.
pub trait HeadingSensor {
    fn heading(&self) -> f64;

    fn reset(&mut self);

    /// Feed a simulated gyro the chassis rotation rate. Real sensors ignore it.
    fn simulate(&mut self, _omega: f64, _dt: f64) {}
}

/// Errors raised while wiring up the drivetrain
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Kinematics error: {0}")]
    Kinematics(#[from] KinematicsError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Clamp a normalised joystick component, treating garbage as zero
fn normalised(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

pub struct Drivetrain<M: SwerveModule, G: HeadingSensor> {
    modules: [M; MODULE_COUNT], // FL, FR, BL, BR
    gyro: G,
    kinematics: SwerveKinematics,
    odometry: SwerveOdometry,
    commanded: [ModuleState; MODULE_COUNT],
    cycle_heading: f64, // sampled once per cycle in periodic()
    max_speed: f64,
    max_angular_speed: f64,
}

impl<M: SwerveModule, G: HeadingSensor> Drivetrain<M, G> {
    /// Wire up the drivetrain: zero the gyro and encoders, build kinematics, seed odometry
    pub fn new(
        mut modules: [M; MODULE_COUNT],
        mut gyro: G,
        config: &DriveConfig,
    ) -> Result<Self, DriveError> {
        config.validate()?;
        let kinematics = SwerveKinematics::new(config.module_offsets)?;

        gyro.reset();
        for module in &mut modules {
            module.reset_position();
        }

        let positions: [ModulePosition; MODULE_COUNT] =
            std::array::from_fn(|i| modules[i].position());
        let heading = gyro.heading();
        let odometry = SwerveOdometry::new(kinematics.clone(), heading, positions);

        info!(
            "Drivetrain ready: max {} m/s, {} rad/s, offsets {:?}",
            config.max_speed, config.max_angular_speed, config.module_offsets
        );

        Ok(Self {
            modules,
            gyro,
            kinematics,
            odometry,
            commanded: [ModuleState::default(); MODULE_COUNT],
            cycle_heading: heading,
            max_speed: config.max_speed,
            max_angular_speed: config.max_angular_speed,
        })
    }

    /// Drive with a normalised command
    ///
    /// Field-relative commands use the heading sampled by the last
    /// `periodic()`, the same value odometry used. Returns the module states
    /// that were dispatched.
    pub fn drive(&mut self, cmd: &DriveCommand) -> [ModuleState; MODULE_COUNT] {
        let vx = normalised(cmd.x_speed) * self.max_speed;
        let vy = normalised(cmd.y_speed) * self.max_speed;
        let omega = normalised(cmd.z_rotation) * self.max_angular_speed;

        let speeds = if cmd.field_relative {
            ChassisSpeeds::from_field_relative(vx, vy, omega, self.cycle_heading)
        } else {
            ChassisSpeeds::new(vx, vy, omega)
        };

        let mut states = self.kinematics.forward(speeds, &self.commanded);
        SwerveKinematics::desaturate(&mut states, self.max_speed);

        debug!("Chassis {:?} -> modules {:?}", speeds, states);
        self.dispatch(states);
        states
    }

    /// Read the modules and the heading sensor, then advance odometry
    ///
    /// The only place the heading sensor is read during a cycle.
    pub fn periodic(&mut self) -> Pose2D {
        let positions = self.module_positions();
        self.cycle_heading = self.gyro.heading();
        self.odometry.update(self.cycle_heading, positions)
    }

    /// Advance simulated modules, then the simulated gyro from the measured chassis rate
    pub fn simulation_periodic(&mut self, dt: f64) {
        for module in &mut self.modules {
            module.simulation_periodic(dt);
        }
        let speeds = self.kinematics.to_chassis_speeds(&self.module_states());
        self.gyro.simulate(speeds.omega, dt);
    }

    /// Zero every module, keeping each wheel pointed where it was
    pub fn stop(&mut self) {
        info!("Stopping all modules");
        let states = self.commanded.map(|state| ModuleState::new(0.0, state.angle));
        self.dispatch(states);
    }

    /// Zero the drive encoders without making the pose jump
    pub fn reset_encoders(&mut self) {
        info!("Resetting module encoders");
        for module in &mut self.modules {
            module.reset_position();
        }
        let pose = self.odometry.pose();
        self.odometry.reset_position(pose, self.module_positions());
    }

    /// Move the pose estimate to a known location
    pub fn reset_pose(&mut self, pose: Pose2D) {
        info!("Resetting pose to {:?}", pose);
        self.odometry.reset_position(pose, self.module_positions());
    }

    pub fn telemetry(&self) -> DriveTelemetry {
        let modules = std::array::from_fn(|i| {
            let measured = self.modules[i].state();
            ModuleTelemetry {
                drive_speed: measured.speed,
                turn_position: measured.angle,
                commanded_angle: self.commanded[i].angle,
            }
        });

        DriveTelemetry {
            modules,
            heading: self.cycle_heading,
            pose: self.odometry.pose(),
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.odometry.pose()
    }

    /// Heading sampled by the last `periodic()`
    pub fn heading(&self) -> f64 {
        self.cycle_heading
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    /// Last dispatched module states
    pub fn commanded_states(&self) -> &[ModuleState; MODULE_COUNT] {
        &self.commanded
    }

    pub fn modules(&self) -> &[M; MODULE_COUNT] {
        &self.modules
    }

    fn module_positions(&self) -> [ModulePosition; MODULE_COUNT] {
        std::array::from_fn(|i| self.modules[i].position())
    }

    fn module_states(&self) -> [ModuleState; MODULE_COUNT] {
        std::array::from_fn(|i| self.modules[i].state())
    }

    fn dispatch(&mut self, states: [ModuleState; MODULE_COUNT]) {
        for ((module, state), name) in self.modules.iter_mut().zip(states).zip(MODULE_NAMES) {
            debug!("{}: speed={:.3} angle={:.3}", name, state.speed, state.angle);
            module.set_desired_state(state);
        }
        self.commanded = states;
    }
}
