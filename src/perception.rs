//! Ray-cast perception for the agent-driven car.
//!
//! Five horizontal rays fan out from the car. Each contributes two values,
//! a normalized hit distance and a hit flag, followed by the car's local
//! linear velocity and yaw rate: 14 floats in a fixed order.

use nalgebra::UnitQuaternion;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::debug_builders::{build_perception_ray, DebugRay};
use crate::vehicle::{local_forward, local_right};

pub const RAY_COUNT: usize = 5;
pub const OBSERVATION_LEN: usize = RAY_COUNT * 2 + 4;

pub const CONFIRM_DETECTION: f32 = 1.0;
pub const CONFIRM_NONDETECTION: f32 = 0.0;
/// Distance reported when a ray hits nothing. Only the flag tells it apart
/// from a hit at exactly the visible distance.
pub const NO_HIT_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    pub visible_distance: f32,    // meters
    pub raycast_y: f32,           // world height of every ray
    pub diagonal_offset_deg: f32, // yaw of the two diagonal rays away from forward
    pub red_threshold: f32,       // debug colour band, normalized distance
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            visible_distance: 25.0,
            raycast_y: 1.3,
            diagonal_offset_deg: 45.0,
            red_threshold: 0.15,
        }
    }
}

/// Answers "how far along this ray is the first obstacle".
pub trait RayCaster {
    /// `dir` is unit length. Returns the hit distance, if any, within `max_dist`.
    fn cast(&self, origin: Point<Real>, dir: Vector<Real>, max_dist: Real) -> Option<Real>;
}

/// The 14 floats handed to a policy.
///
/// Layout: five `(normalized distance, flag)` pairs, then the car-frame
/// velocity `(x, y, z)` and the yaw rate. The car frame is right-handed with
/// +X right, +Y up and forward along -Z, so driving forward reads as a
/// negative `z` velocity and turning left (counter-clockwise seen from
/// above) reads as a positive yaw rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub values: [f32; OBSERVATION_LEN],
}

impl Observation {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// `(normalized distance, flag)` for ray `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= RAY_COUNT`.
    pub fn ray(&self, i: usize) -> (f32, f32) {
        assert!(i < RAY_COUNT, "ray index {i} out of range");
        (self.values[2 * i], self.values[2 * i + 1])
    }

    pub fn local_velocity(&self) -> [f32; 3] {
        let base = RAY_COUNT * 2;
        [self.values[base], self.values[base + 1], self.values[base + 2]]
    }

    pub fn yaw_rate(&self) -> f32 {
        self.values[OBSERVATION_LEN - 1]
    }
}

/// Kinematic state the encoder reads off the car.
#[derive(Debug, Clone, Copy)]
pub struct CarKinematics {
    pub pose: Isometry<Real>,
    pub linvel: Vector<Real>,
    pub angvel: Vector<Real>,
}

impl CarKinematics {
    pub fn of(body: &RigidBody) -> Self {
        Self {
            pose: *body.position(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerceptionEncoder {
    pub config: PerceptionConfig,
}

impl PerceptionEncoder {
    pub fn new(config: PerceptionConfig) -> Self {
        Self { config }
    }

    /// Ray directions in world space before horizontal projection, in
    /// observation order: forward, right, left, right diagonal, left diagonal.
    pub fn ray_directions(&self, rotation: &Rotation<Real>) -> [Vector<Real>; RAY_COUNT] {
        let offset = self.config.diagonal_offset_deg.to_radians();
        // Positive yaw about +Y swings forward (-Z) toward the left (-X).
        let toward_right = UnitQuaternion::from_axis_angle(&Vector::y_axis(), -offset);
        let toward_left = UnitQuaternion::from_axis_angle(&Vector::y_axis(), offset);

        let forward = local_forward();
        let right = local_right();
        [
            rotation * forward,
            rotation * right,
            rotation * -right,
            rotation * (toward_right * forward),
            rotation * (toward_left * forward),
        ]
    }

    /// Build the observation, plus one debug ray per cast.
    pub fn encode<C: RayCaster + ?Sized>(
        &self,
        car: &CarKinematics,
        caster: &C,
    ) -> (Observation, Vec<DebugRay>) {
        let cfg = &self.config;
        let mut values = [0.0; OBSERVATION_LEN];
        let mut rays = Vec::with_capacity(RAY_COUNT);

        let t = car.pose.translation.vector;
        let origin = point![t.x, cfg.raycast_y, t.z];

        for (i, direction) in self.ray_directions(&car.pose.rotation).iter().enumerate() {
            let flat = vector![direction.x, 0.0, direction.z];

            // A car pointing straight up has no horizontal heading; report nothing seen.
            let hit = match UnitVector::try_new(flat, 1.0e-6) {
                Some(dir) => {
                    let hit = caster
                        .cast(origin, *dir, cfg.visible_distance)
                        .filter(|d| *d > 0.0);
                    rays.push(build_perception_ray(
                        origin,
                        *dir,
                        cfg.visible_distance,
                        hit,
                        cfg.red_threshold,
                    ));
                    hit
                }
                None => None,
            };

            let (distance, flag) = match hit {
                Some(d) => (d / cfg.visible_distance, CONFIRM_DETECTION),
                None => (NO_HIT_DISTANCE, CONFIRM_NONDETECTION),
            };
            values[2 * i] = distance;
            values[2 * i + 1] = flag;
        }

        let rot = car.pose.rotation;
        let local_linvel = rot.inverse_transform_vector(&car.linvel);
        let local_angvel = rot.inverse_transform_vector(&car.angvel);

        let base = RAY_COUNT * 2;
        values[base] = local_linvel.x;
        values[base + 1] = local_linvel.y;
        values[base + 2] = local_linvel.z;
        values[base + 3] = local_angvel.y;

        (Observation { values }, rays)
    }
}
