use serde::{Deserialize, Serialize};

pub const ROAD_TAG: &str = "road";

/// What a car just touched, as reported by the physics step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub other_name: String,
    pub surface_tag: String,
}

impl Collision {
    pub fn new(other_name: impl Into<String>, surface_tag: impl Into<String>) -> Self {
        Self {
            other_name: other_name.into(),
            surface_tag: surface_tag.into(),
        }
    }
}

/// Decides which contacts count as a crash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionMonitor {
    drivable_tag: String,
}

impl Default for CollisionMonitor {
    fn default() -> Self {
        Self::new(ROAD_TAG)
    }
}

impl CollisionMonitor {
    pub fn new(drivable_tag: impl Into<String>) -> Self {
        Self {
            drivable_tag: drivable_tag.into(),
        }
    }

    pub fn drivable_tag(&self) -> &str {
        &self.drivable_tag
    }

    /// Anything that is not the drivable surface is a crash.
    pub fn requires_reset(&self, event: &Collision) -> bool {
        event.surface_tag != self.drivable_tag
    }
}
