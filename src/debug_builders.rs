// ==============================================================================
// debug_builders.rs — DEBUG RAY PRIMITIVES (SERVER -> CLIENT)
// ------------------------------------------------------------------------------
// Serializable rays for the perception fan:
// - green: nothing within visible distance
// - red: hit closer than the red threshold (normalized)
// - yellow: any other hit
//
// Purely visualization scaffolding. Nothing in here feeds back into the
// observation vector.
// ==============================================================================

use rapier3d::prelude::*;
use serde::Serialize;

pub const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
pub const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugRay {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub hit: Option<[f32; 3]>,
    pub color: [f32; 3],
}

pub fn ray_color(normalized_hit: Option<f32>, red_threshold: f32) -> [f32; 3] {
    match normalized_hit {
        None => GREEN,
        Some(d) if d < red_threshold => RED,
        Some(_) => YELLOW,
    }
}

/// Ray drawn at full visible length, with the hit point when there is one.
pub fn build_perception_ray(
    origin: Point<Real>,
    dir: Vector<Real>,
    visible_distance: Real,
    hit_distance: Option<Real>,
    red_threshold: f32,
) -> DebugRay {
    let normalized = hit_distance.map(|d| d / visible_distance);
    DebugRay {
        origin: origin.into(),
        direction: dir.into(),
        length: visible_distance,
        hit: hit_distance.map(|d| (origin + dir * d).into()),
        color: ray_color(normalized, red_threshold),
    }
}
