// Swerve drive core for a four-module chassis
//
// Provides:
// - Chassis geometry and value types
// - Forward/inverse swerve kinematics with speed desaturation
// - Field pose odometry driven by an external heading sensor
// - Drivetrain wiring over module and heading-sensor contracts
// - Ideal simulated modules and gyro

mod drivetrain;
pub mod geometry;
pub mod kinematics;
pub mod odometry;
pub mod sim;

pub use drivetrain::{DriveError, Drivetrain, HeadingSensor, SwerveModule};
pub use geometry::{
    BACK_LEFT, BACK_RIGHT, ChassisSpeeds, FRONT_LEFT, FRONT_RIGHT, MODULE_COUNT, MODULE_NAMES,
    ModuleOffset, ModulePosition, ModuleState, Pose2D, Twist2D,
};
pub use kinematics::{KinematicsError, SwerveKinematics};
pub use odometry::SwerveOdometry;
pub use sim::{SimGyro, SimModule};
