use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::control::{AxisInput, ControlMode, ControlSource, PolicyAction};
use crate::debug_builders::DebugRay;
use crate::physics::PhysicsWorld;

// --------------------------------------------------
// Wire messages
// --------------------------------------------------
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        horizontal: f32,
        #[serde(default)]
        vertical: f32,
    },
    Action {
        #[serde(default)]
        action: Vec<f32>,
    },
    Reset,
    Ping,
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Option<Self> {
        match serde_json::from_str(txt) {
            Ok(msg) => Some(msg),
            Err(err) => {
                debug!(error = %err, "dropping malformed client message");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CarSnapshot {
    pub id: String,
    pub mode: Option<&'static str>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Welcome {
        car_id: String,
    },
    Pong,
    Observation {
        tick: u64,
        car_id: String,
        observation: Vec<f32>,
        collided: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        rays: Option<Vec<DebugRay>>,
    },
    Snapshot {
        tick: u64,
        cars: Vec<CarSnapshot>,
    },
}

impl ServerMessage {
    /// `None` if the message could not be serialized; the failure is logged
    /// and nothing should be sent.
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!(error = %err, "dropping unserializable server message");
                None
            }
        }
    }
}

// --------------------------------------------------
// Sessions
// --------------------------------------------------
pub struct Session {
    pub car_id: String,
    pub tx: UnboundedSender<String>,
    pub control: Option<ControlMode>,
}

impl Session {
    pub fn send(&self, msg: &ServerMessage) {
        if let Some(json) = msg.to_json() {
            let _ = self.tx.send(json);
        }
    }
}

pub struct SharedState {
    pub tick: u64,
    pub sessions: HashMap<String, Session>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            sessions: HashMap::new(),
        }
    }

    pub fn register_session(&mut self, car_id: String, tx: UnboundedSender<String>) {
        self.sessions.insert(
            car_id.clone(),
            Session {
                car_id,
                tx,
                control: None,
            },
        );
    }

    pub fn remove_session(&mut self, car_id: &str) {
        self.sessions.remove(car_id);
    }

    /// Latest axes win; switches the car to manual driving.
    pub fn update_input(&mut self, car_id: &str, axes: AxisInput) {
        if let Some(session) = self.sessions.get_mut(car_id) {
            session.control = Some(ControlMode::Manual(axes));
        }
    }

    /// Latest action wins; switches the car to agent driving.
    pub fn update_action(&mut self, car_id: &str, action: PolicyAction) {
        if let Some(session) = self.sessions.get_mut(car_id) {
            session.control = Some(ControlMode::Agent(action));
        }
    }

    /// Controller adapter pass: one signal per controlled car.
    pub fn apply_controls(&mut self, phys: &mut PhysicsWorld) {
        for session in self.sessions.values_mut() {
            if let Some(control) = session.control.as_mut() {
                phys.drive_car(&session.car_id, control.signal());
            }
        }
    }

    /// Observation for every agent-driven car, sent to its own client.
    pub fn send_observations(&self, phys: &mut PhysicsWorld, with_rays: bool) {
        for session in self.sessions.values() {
            if !session.control.as_ref().is_some_and(ControlMode::is_agent) {
                continue;
            }
            let Some((observation, rays)) = phys.observe(&session.car_id) else { continue };
            let collided = phys.take_collided(&session.car_id);

            session.send(&ServerMessage::Observation {
                tick: self.tick,
                car_id: session.car_id.clone(),
                observation: observation.as_slice().to_vec(),
                collided,
                rays: with_rays.then_some(rays),
            });
        }
    }

    /// Build and send a snapshot of all cars to all clients.
    pub fn broadcast_snapshot(&self, phys: &PhysicsWorld) {
        let cars = self
            .sessions
            .values()
            .filter_map(|session| {
                let body = phys.car_body(&session.car_id)?;
                let pos = body.translation();
                Some(CarSnapshot {
                    id: session.car_id.clone(),
                    mode: session.control.as_ref().map(ControlMode::name),
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                })
            })
            .collect();

        let Some(json) = (ServerMessage::Snapshot {
            tick: self.tick,
            cars,
        })
        .to_json() else {
            return;
        };

        for session in self.sessions.values() {
            let _ = session.tx.send(json.clone());
        }
    }
}
