// Swerve drive kinematics for a four-module chassis
// Maps chassis velocity to module states and measured module travel back to a chassis twist.
//
// Each module at offset (x, y) sees the chassis velocity plus the tangential
// velocity from rotation about the center:
//   v_module = (vx - omega * y, vy + omega * x)
// Stacking both rows for all four modules gives an 8x3 geometry matrix A.
// The inverse direction uses its least-squares pseudo-inverse (AᵀA)⁻¹Aᵀ,
// computed once at construction.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use super::geometry::{
    ChassisSpeeds, MODULE_COUNT, ModuleOffset, ModulePosition, ModuleState, Twist2D,
};

/// Module speeds at or below this are treated as stopped (angle undefined)
pub const STOPPED_SPEED_EPSILON: f64 = 1e-9;

/// Smallest eigenvalue of the size-normalised AᵀA below this means the
/// geometry cannot resolve rotation
const SINGULAR_EPSILON: f64 = 1e-9;

type GeometryMatrix = SMatrix<f64, { 2 * MODULE_COUNT }, 3>;
type InverseMatrix = SMatrix<f64, 3, { 2 * MODULE_COUNT }>;
type ModuleVector = SVector<f64, { 2 * MODULE_COUNT }>;

/// Rows 2i and 2i+1: [1, 0, -y_i / scale] and [0, 1, x_i / scale]
fn geometry_matrix(offsets: &[ModuleOffset; MODULE_COUNT], scale: f64) -> GeometryMatrix {
    GeometryMatrix::from_fn(|row, col| {
        let offset = offsets[row / 2];
        match (row % 2, col) {
            (0, 0) | (1, 1) => 1.0,
            (0, 2) => -offset.y / scale,
            (1, 2) => offset.x / scale,
            _ => 0.0,
        }
    })
}

/// Error types for kinematics construction
#[derive(Debug, thiserror::Error)]
pub enum KinematicsError {
    #[error("Module {index} has a non-finite offset ({x}, {y})")]
    InvalidOffset { index: usize, x: f64, y: f64 },

    #[error("Module geometry is singular (min eigenvalue {min_eigenvalue:e}), rotation cannot be resolved")]
    SingularGeometry { min_eigenvalue: f64 },
}

/// Kinematic model of the chassis, derived from the four fixed module offsets
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    offsets: [ModuleOffset; MODULE_COUNT],
    inverse: InverseMatrix,
}

impl SwerveKinematics {
    /// Build the kinematic model, rejecting geometry that cannot be inverted
    pub fn new(offsets: [ModuleOffset; MODULE_COUNT]) -> Result<Self, KinematicsError> {
        for (index, offset) in offsets.iter().enumerate() {
            if !offset.x.is_finite() || !offset.y.is_finite() {
                return Err(KinematicsError::InvalidOffset {
                    index,
                    x: offset.x,
                    y: offset.y,
                });
            }
        }

        // Rank check on offsets scaled to unit chassis size, so the
        // threshold holds for any chassis dimensions
        let scale = offsets.iter().map(ModuleOffset::norm).fold(0.0f64, f64::max);
        let unit = geometry_matrix(&offsets, if scale > 0.0 { scale } else { 1.0 });
        let min_eigenvalue = (unit.transpose() * unit)
            .symmetric_eigenvalues()
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        if min_eigenvalue < SINGULAR_EPSILON {
            return Err(KinematicsError::SingularGeometry { min_eigenvalue });
        }

        let geometry = geometry_matrix(&offsets, 1.0);
        let normal: Matrix3<f64> = geometry.transpose() * geometry;
        let normal_inv = normal
            .try_inverse()
            .ok_or(KinematicsError::SingularGeometry { min_eigenvalue })?;

        Ok(Self {
            offsets,
            inverse: normal_inv * geometry.transpose(),
        })
    }

    /// Module offsets in FL/FR/BL/BR order
    pub fn offsets(&self) -> &[ModuleOffset; MODULE_COUNT] {
        &self.offsets
    }

    /// Convert chassis speeds to module states
    ///
    /// A module whose speed is effectively zero keeps its angle from
    /// `previous` instead of snapping to 0, so the wheels don't twitch at rest.
    pub fn forward(
        &self,
        speeds: ChassisSpeeds,
        previous: &[ModuleState; MODULE_COUNT],
    ) -> [ModuleState; MODULE_COUNT] {
        let mut states = [ModuleState::default(); MODULE_COUNT];

        for (i, offset) in self.offsets.iter().enumerate() {
            let vx = speeds.vx - speeds.omega * offset.y;
            let vy = speeds.vy + speeds.omega * offset.x;
            let speed = vx.hypot(vy);

            states[i] = if speed <= STOPPED_SPEED_EPSILON {
                ModuleState::new(0.0, previous[i].angle)
            } else {
                ModuleState::new(speed, vy.atan2(vx))
            };
        }

        states
    }

    /// Scale all module speeds down uniformly so none exceeds `max_speed`
    ///
    /// Ratios between modules are preserved, so the commanded path curvature
    /// is unchanged. Angles are never touched.
    pub fn desaturate(states: &mut [ModuleState; MODULE_COUNT], max_speed: f64) {
        let max_observed = states
            .iter()
            .map(|state| state.speed.abs())
            .fold(0.0f64, f64::max);

        if max_observed > max_speed {
            let scale = max_speed / max_observed;
            for state in states.iter_mut() {
                state.speed *= scale;
            }
        }
    }

    /// Chassis-frame displacement explaining the module travel between two samples
    pub fn to_twist(
        &self,
        now: &[ModulePosition; MODULE_COUNT],
        previous: &[ModulePosition; MODULE_COUNT],
    ) -> Twist2D {
        let deltas = ModuleVector::from_fn(|row, _| {
            let delta = now[row / 2].distance - previous[row / 2].distance;
            let angle = now[row / 2].angle;
            if row % 2 == 0 {
                delta * angle.cos()
            } else {
                delta * angle.sin()
            }
        });

        let solved: Vector3<f64> = self.inverse * deltas;
        Twist2D {
            dx: solved[0],
            dy: solved[1],
            dtheta: solved[2],
        }
    }

    /// Average chassis speeds over `dt` seconds between two position samples
    ///
    /// Returns zero speeds when `dt` is zero, negative or not finite.
    pub fn inverse(
        &self,
        now: &[ModulePosition; MODULE_COUNT],
        previous: &[ModulePosition; MODULE_COUNT],
        dt: f64,
    ) -> ChassisSpeeds {
        if !dt.is_finite() || dt <= 0.0 {
            return ChassisSpeeds::zero();
        }

        let twist = self.to_twist(now, previous);
        ChassisSpeeds::new(twist.dx / dt, twist.dy / dt, twist.dtheta / dt)
    }

    /// Chassis speeds best explaining a set of measured module velocities
    pub fn to_chassis_speeds(&self, states: &[ModuleState; MODULE_COUNT]) -> ChassisSpeeds {
        let velocities = ModuleVector::from_fn(|row, _| {
            let state = states[row / 2];
            if row % 2 == 0 {
                state.speed * state.angle.cos()
            } else {
                state.speed * state.angle.sin()
            }
        });

        let solved: Vector3<f64> = self.inverse * velocities;
        ChassisSpeeds::new(solved[0], solved[1], solved[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MODULE_OFFSETS;
    use crate::drive::geometry::{BACK_LEFT, BACK_RIGHT, FRONT_LEFT, FRONT_RIGHT};
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOL: f64 = 1e-9;

    fn square_chassis() -> SwerveKinematics {
        SwerveKinematics::new(DEFAULT_MODULE_OFFSETS).expect("default geometry is valid")
    }

    fn rest() -> [ModuleState; MODULE_COUNT] {
        [ModuleState::default(); MODULE_COUNT]
    }

    fn positions(distances: [f64; 4], angles: [f64; 4]) -> [ModulePosition; MODULE_COUNT] {
        std::array::from_fn(|i| ModulePosition::new(distances[i], angles[i]))
    }

    #[test]
    fn test_zero_velocity() {
        let states = square_chassis().forward(ChassisSpeeds::zero(), &rest());
        for state in states {
            assert_eq!(state.speed, 0.0);
            assert_eq!(state.angle, 0.0);
        }
    }

    #[test]
    fn test_stopped_module_holds_previous_angle() {
        let previous = [ModuleState::new(1.2, 0.7); MODULE_COUNT];
        let states = square_chassis().forward(ChassisSpeeds::zero(), &previous);
        for (i, state) in states.iter().enumerate() {
            assert_eq!(state.speed, 0.0, "module {} should be stopped", i);
            assert_eq!(state.angle, 0.7, "module {} should hold its angle", i);
        }
    }

    #[test]
    fn test_pure_translation_drives_all_wheels_identically() {
        let kin = square_chassis();
        for &(vx, vy) in &[(1.0, 0.0), (0.0, -2.0), (1.5, 0.8), (-0.3, -0.4)] {
            let states = kin.forward(ChassisSpeeds::new(vx, vy, 0.0), &rest());
            let expected_speed = f64::hypot(vx, vy);
            let expected_angle = f64::atan2(vy, vx);
            for state in states {
                assert!((state.speed - expected_speed).abs() < TOL);
                assert!((state.angle - expected_angle).abs() < TOL);
            }
        }
    }

    #[test]
    fn test_pure_rotation_is_perpendicular_to_radius() {
        let kin = square_chassis();
        let omega = 1.3;
        let states = kin.forward(ChassisSpeeds::new(0.0, 0.0, omega), &rest());

        for (state, offset) in states.iter().zip(kin.offsets()) {
            // Wheel direction dotted with the radius vector must vanish
            let dot = state.angle.cos() * offset.x + state.angle.sin() * offset.y;
            assert!(dot.abs() < TOL, "wheel not perpendicular to radius: dot={}", dot);
            assert!((state.speed - omega * offset.norm()).abs() < TOL);
        }
    }

    #[test]
    fn test_pure_rotation_speed_proportional_to_radius() {
        let offsets = [
            ModuleOffset::new(0.5, 0.2),
            ModuleOffset::new(0.3, -0.3),
            ModuleOffset::new(-0.1, 0.4),
            ModuleOffset::new(-0.6, -0.2),
        ];
        let kin = SwerveKinematics::new(offsets).unwrap();
        let states = kin.forward(ChassisSpeeds::new(0.0, 0.0, -0.8), &rest());
        for (state, offset) in states.iter().zip(offsets.iter()) {
            assert!((state.speed / offset.norm() - 0.8).abs() < TOL);
        }
    }

    #[test]
    fn test_rotation_scenario_front_left_angle() {
        let states = square_chassis().forward(ChassisSpeeds::new(0.0, 0.0, 1.0), &rest());
        let expected = f64::atan2(0.292, -0.267);
        println!("FL angle = {}, expected {}", states[FRONT_LEFT].angle, expected);
        assert!((states[FRONT_LEFT].angle - expected).abs() < TOL);

        let speed = states[FRONT_LEFT].speed;
        for i in [FRONT_RIGHT, BACK_LEFT, BACK_RIGHT] {
            assert!((states[i].speed - speed).abs() < TOL, "square geometry gives equal radii");
        }
    }

    #[test]
    fn test_desaturate_scales_uniformly() {
        let mut states = [
            ModuleState::new(4.0, 0.1),
            ModuleState::new(-6.0, 0.2),
            ModuleState::new(2.0, 0.3),
            ModuleState::new(3.0, 0.4),
        ];
        SwerveKinematics::desaturate(&mut states, 3.0);

        assert!((states[0].speed - 2.0).abs() < TOL);
        assert!((states[1].speed + 3.0).abs() < TOL);
        assert!((states[2].speed - 1.0).abs() < TOL);
        assert!((states[3].speed - 1.5).abs() < TOL);
        assert_eq!(states[0].angle, 0.1);
        assert_eq!(states[3].angle, 0.4);
    }

    #[test]
    fn test_desaturate_noop_below_max() {
        let original = [
            ModuleState::new(1.0, 0.5),
            ModuleState::new(2.9, -0.5),
            ModuleState::new(0.0, PI),
            ModuleState::new(-3.0, 1.0),
        ];
        let mut states = original;
        SwerveKinematics::desaturate(&mut states, 3.0);
        assert_eq!(states, original);
    }

    #[test]
    fn test_desaturate_idempotent() {
        let mut once = [
            ModuleState::new(7.0, 0.3),
            ModuleState::new(5.0, -1.2),
            ModuleState::new(-9.5, 2.0),
            ModuleState::new(1.0, 0.0),
        ];
        SwerveKinematics::desaturate(&mut once, 3.0);
        let mut twice = once;
        SwerveKinematics::desaturate(&mut twice, 3.0);

        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a.speed - b.speed).abs() < TOL);
            assert_eq!(a.angle, b.angle);
        }
        let max = once.iter().map(|s| s.speed.abs()).fold(0.0, f64::max);
        assert!((max - 3.0).abs() < TOL);
    }

    #[test]
    fn test_twist_zero_displacement() {
        let kin = square_chassis();
        let p = positions([1.0, 2.0, 3.0, 4.0], [0.1, 0.2, 0.3, 0.4]);
        let twist = kin.to_twist(&p, &p);
        assert!(twist.dx.abs() < TOL && twist.dy.abs() < TOL && twist.dtheta.abs() < TOL);
    }

    #[test]
    fn test_twist_straight_strafe() {
        let kin = square_chassis();
        let before = positions([0.0; 4], [FRAC_PI_2; 4]);
        let after = positions([0.25; 4], [FRAC_PI_2; 4]);
        let twist = kin.to_twist(&after, &before);
        assert!(twist.dx.abs() < TOL);
        assert!((twist.dy - 0.25).abs() < TOL);
        assert!(twist.dtheta.abs() < TOL);
    }

    #[test]
    fn test_twist_recovers_forward_rotation() {
        // Drive each module the distance it would cover under a pure spin
        let kin = square_chassis();
        let dtheta = 0.1;
        let states = kin.forward(ChassisSpeeds::new(0.0, 0.0, dtheta), &rest());
        let before = positions([0.0; 4], states.map(|s| s.angle));
        let after = positions(states.map(|s| s.speed), states.map(|s| s.angle));

        let twist = kin.to_twist(&after, &before);
        assert!(twist.dx.abs() < TOL);
        assert!(twist.dy.abs() < TOL);
        assert!((twist.dtheta - dtheta).abs() < TOL);
    }

    #[test]
    fn test_inverse_divides_by_dt() {
        let kin = square_chassis();
        let before = positions([0.0; 4], [0.0; 4]);
        let after = positions([0.06; 4], [0.0; 4]);
        let speeds = kin.inverse(&after, &before, 0.02);
        assert!((speeds.vx - 3.0).abs() < 1e-6);
        assert!(speeds.vy.abs() < TOL);
    }

    #[test]
    fn test_inverse_zero_dt_returns_zero() {
        let kin = square_chassis();
        let before = positions([0.0; 4], [0.0; 4]);
        let after = positions([0.5; 4], [0.0; 4]);
        assert_eq!(kin.inverse(&after, &before, 0.0), ChassisSpeeds::zero());
        assert_eq!(kin.inverse(&after, &before, -0.02), ChassisSpeeds::zero());
        assert_eq!(kin.inverse(&after, &before, f64::NAN), ChassisSpeeds::zero());
    }

    #[test]
    fn test_chassis_speeds_round_trip_through_forward() {
        let kin = square_chassis();
        let commanded = ChassisSpeeds::new(1.1, -0.4, 0.9);
        let states = kin.forward(commanded, &rest());
        let recovered = kin.to_chassis_speeds(&states);
        println!("commanded {:?}, recovered {:?}", commanded, recovered);
        assert!((recovered.vx - commanded.vx).abs() < TOL);
        assert!((recovered.vy - commanded.vy).abs() < TOL);
        assert!((recovered.omega - commanded.omega).abs() < TOL);
    }

    #[test]
    fn test_coincident_modules_rejected() {
        let offsets = [ModuleOffset::new(0.3, 0.2); MODULE_COUNT];
        match SwerveKinematics::new(offsets) {
            Err(KinematicsError::SingularGeometry { .. }) => {}
            other => panic!("expected singular geometry, got {:?}", other),
        }
    }

    #[test]
    fn test_geometry_check_independent_of_chassis_size() {
        // Same square shape in micrometres and in hundreds of metres
        for scale in [1e-5, 1.0, 500.0] {
            let offsets = DEFAULT_MODULE_OFFSETS.map(|o| ModuleOffset::new(o.x * scale, o.y * scale));
            let kin = SwerveKinematics::new(offsets)
                .unwrap_or_else(|e| panic!("scale {} rejected: {}", scale, e));
            let recovered = kin.to_chassis_speeds(&kin.forward(ChassisSpeeds::new(0.2, 0.1, 0.5), &rest()));
            assert!((recovered.omega - 0.5).abs() < 1e-6, "scale {}: omega {}", scale, recovered.omega);
        }

        // Coincident modules stay singular at any size
        for scale in [1e-5, 500.0] {
            let offsets = [ModuleOffset::new(0.3 * scale, 0.2 * scale); MODULE_COUNT];
            assert!(matches!(
                SwerveKinematics::new(offsets),
                Err(KinematicsError::SingularGeometry { .. })
            ));
        }
    }

    #[test]
    fn test_non_finite_offset_rejected() {
        let mut offsets = DEFAULT_MODULE_OFFSETS;
        offsets[BACK_LEFT] = ModuleOffset::new(f64::NAN, 0.1);
        match SwerveKinematics::new(offsets) {
            Err(KinematicsError::InvalidOffset { index, .. }) => assert_eq!(index, BACK_LEFT),
            other => panic!("expected invalid offset, got {:?}", other),
        }
    }
}
