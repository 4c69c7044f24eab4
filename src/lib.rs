//! Ray-cast driving agent server.
//!
//! Cars live in a rapier world. Each websocket client drives one car, either
//! with two input axes or with a policy's action vector; agent-driven cars
//! get a 14-float ray-cast observation back every decision tick. Any contact
//! with something other than the road sends the car back to its checkpoint.

pub mod car;
pub mod collision;
pub mod config;
pub mod control;
pub mod debug_builders;
pub mod error;
pub mod net;
pub mod perception;
pub mod physics;
pub mod reset;
pub mod state;
pub mod vehicle;

pub use car::Car;
pub use collision::{Collision, CollisionMonitor, ROAD_TAG};
pub use config::{ObstacleConfig, ServerConfig};
pub use control::{
    Actuator, AxisInput, ControlMode, ControlSignal, ControlSource, PolicyAction,
};
pub use error::ServerError;
pub use perception::{
    CarKinematics, Observation, PerceptionConfig, PerceptionEncoder, RayCaster, OBSERVATION_LEN,
};
pub use physics::PhysicsWorld;
pub use reset::{reset_body, ResetCheckpoint};
pub use state::SharedState;
pub use vehicle::{Vehicle, VehicleConfig};
