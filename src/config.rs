use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collision::ROAD_TAG;
use crate::error::{Result, ServerError};
use crate::perception::PerceptionConfig;
use crate::reset::ResetCheckpoint;
use crate::vehicle::VehicleConfig;

/// A static, tagged box in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub name: String,
    pub tag: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
}

impl ObstacleConfig {
    pub fn new(name: &str, tag: &str, position: [f32; 3], half_extents: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            position,
            half_extents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub tick_hz: u32,
    /// Ticks between observations for agent-driven cars.
    pub decision_period: u64,
    pub drivable_tag: String,
    pub ground_half_size: f32,
    pub checkpoint: ResetCheckpoint,
    pub perception: PerceptionConfig,
    pub vehicle: VehicleConfig,
    pub obstacles: Vec<ObstacleConfig>,
    pub debug_rays: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9001".to_string(),
            tick_hz: 60,
            decision_period: 1,
            drivable_tag: ROAD_TAG.to_string(),
            ground_half_size: 500.0,
            checkpoint: ResetCheckpoint::default(),
            perception: PerceptionConfig::default(),
            vehicle: VehicleConfig::default(),
            obstacles: arena_walls(100.0),
            debug_rays: false,
        }
    }
}

/// Four walls boxing in a square arena of half-size `half`.
pub fn arena_walls(half: f32) -> Vec<ObstacleConfig> {
    let h = [half, 2.0, 0.5];
    let v = [0.5, 2.0, half];
    vec![
        ObstacleConfig::new("North wall", "wall", [0.0, 2.0, -half], h),
        ObstacleConfig::new("South wall", "wall", [0.0, 2.0, half], h),
        ObstacleConfig::new("East wall", "wall", [half, 2.0, 0.0], v),
        ObstacleConfig::new("West wall", "wall", [-half, 2.0, 0.0], v),
    ]
}

impl ServerConfig {
    /// Defaults, overlaid with the JSON file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_hz == 0 {
            return Err(ServerError::InvalidConfig("tick_hz must be positive".into()));
        }
        if self.decision_period == 0 {
            return Err(ServerError::InvalidConfig(
                "decision_period must be positive".into(),
            ));
        }
        if self.drivable_tag.is_empty() {
            return Err(ServerError::InvalidConfig("drivable_tag is empty".into()));
        }
        let p = &self.perception;
        if !(p.visible_distance.is_finite() && p.visible_distance > 0.0) {
            return Err(ServerError::InvalidConfig(format!(
                "visible_distance must be positive, got {}",
                p.visible_distance
            )));
        }
        if self.checkpoint.position.iter().any(|c| !c.is_finite()) {
            return Err(ServerError::InvalidConfig(
                "checkpoint position is not finite".into(),
            ));
        }
        let q = self.checkpoint.rotation;
        if q.iter().map(|c| c * c).sum::<f32>() < 1e-6 {
            return Err(ServerError::InvalidConfig(
                "checkpoint rotation is not a valid quaternion".into(),
            ));
        }
        Ok(())
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }
}
