// Field pose estimation from module travel and an external heading sensor
//
// Translation comes from the module distances (least-squares twist), rotated
// into the field frame by the sensor heading. The heading itself is taken
// straight from the sensor; the drive-derived rotation is not integrated.

use super::geometry::{MODULE_COUNT, ModulePosition, Pose2D};
use super::kinematics::SwerveKinematics;

/// Pose integrator for a swerve chassis
#[derive(Debug, Clone)]
pub struct SwerveOdometry {
    kinematics: SwerveKinematics,
    pose: Pose2D,
    previous_positions: [ModulePosition; MODULE_COUNT],
}

impl SwerveOdometry {
    /// Start at the field origin facing `initial_heading`
    pub fn new(
        kinematics: SwerveKinematics,
        initial_heading: f64,
        initial_positions: [ModulePosition; MODULE_COUNT],
    ) -> Self {
        Self {
            kinematics,
            pose: Pose2D::new(0.0, 0.0, initial_heading),
            previous_positions: initial_positions,
        }
    }

    /// Advance the pose with this cycle's readings and return it
    ///
    /// Call exactly once per control cycle with fresh readings.
    pub fn update(&mut self, heading: f64, positions: [ModulePosition; MODULE_COUNT]) -> Pose2D {
        let twist = self.kinematics.to_twist(&positions, &self.previous_positions);

        let (sin, cos) = heading.sin_cos();
        self.pose.x += twist.dx * cos - twist.dy * sin;
        self.pose.y += twist.dx * sin + twist.dy * cos;
        self.pose.heading = heading;

        self.previous_positions = positions;
        self.pose
    }

    /// Jump to a known pose, re-seeding the position cache
    pub fn reset_position(&mut self, pose: Pose2D, positions: [ModulePosition; MODULE_COUNT]) {
        self.pose = pose;
        self.previous_positions = positions;
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }
}
