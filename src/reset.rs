use nalgebra::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

/// Pose a car is teleported back to. Set once at spawn, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetCheckpoint {
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion [i, j, k, w]
}

impl Default for ResetCheckpoint {
    fn default() -> Self {
        Self {
            position: [0.0, 1.3, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl ResetCheckpoint {
    /// Checkpoint at `position` facing `yaw` radians about +Y.
    pub fn from_yaw(position: [f32; 3], yaw: f32) -> Self {
        let q = UnitQuaternion::from_axis_angle(&Vector::y_axis(), yaw);
        Self {
            position,
            rotation: [q.i, q.j, q.k, q.w],
        }
    }

    pub fn pose(&self) -> Isometry<Real> {
        let [x, y, z] = self.position;
        let [i, j, k, w] = self.rotation;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(w, i, j, k));
        Isometry::from_parts(vector![x, y, z].into(), rotation)
    }
}

/// Stop the body dead and put it back on the checkpoint.
///
/// Absolute overwrite: calling it again changes nothing.
pub fn reset_body(body: &mut RigidBody, checkpoint: &ResetCheckpoint) {
    body.set_linvel(Vector::zeros(), true);
    body.set_angvel(Vector::zeros(), true);
    body.set_position(checkpoint.pose(), true);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_body() -> RigidBody {
        RigidBodyBuilder::dynamic()
            .translation(vector![12.0, 3.0, -40.0])
            .rotation(vector![0.0, 1.1, 0.0])
            .linvel(vector![4.0, -1.0, 20.0])
            .angvel(vector![0.0, 2.5, 0.0])
            .build()
    }

    #[test]
    fn reset_zeroes_velocity_and_restores_pose() {
        let checkpoint = ResetCheckpoint::from_yaw([5.0, 1.3, -2.0], 0.7);
        let mut body = moving_body();

        reset_body(&mut body, &checkpoint);

        assert_eq!(*body.linvel(), Vector::zeros());
        assert_eq!(*body.angvel(), Vector::zeros());
        assert_eq!(*body.position(), checkpoint.pose());
    }

    #[test]
    fn reset_is_idempotent() {
        let checkpoint = ResetCheckpoint::default();
        let mut once = moving_body();
        let mut twice = moving_body();

        reset_body(&mut once, &checkpoint);
        reset_body(&mut twice, &checkpoint);
        reset_body(&mut twice, &checkpoint);

        assert_eq!(once.position(), twice.position());
        assert_eq!(once.linvel(), twice.linvel());
        assert_eq!(once.angvel(), twice.angvel());
    }

    #[test]
    fn default_checkpoint_is_upright_at_origin() {
        let pose = ResetCheckpoint::default().pose();
        assert_eq!(pose.translation.vector, vector![0.0, 1.3, 0.0]);
        assert_eq!(pose.rotation, UnitQuaternion::identity());
    }
}
