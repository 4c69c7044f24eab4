use rapier3d::prelude::*;
use tracing::info;

use crate::collision::{Collision, CollisionMonitor};
use crate::control::{apply_signal, ControlSignal};
use crate::reset::{reset_body, ResetCheckpoint};
use crate::vehicle::Vehicle;

/// One driven car: the hooks the tick loop calls into.
///
/// The car never owns its rigid body; the physics world lends it out for
/// the duration of each hook.
#[derive(Debug, Clone)]
pub struct Car {
    pub id: String,
    pub vehicle: Vehicle,
    pub checkpoint: ResetCheckpoint,
    monitor: CollisionMonitor,
    collided: bool,
}

impl Car {
    pub fn new(
        id: impl Into<String>,
        vehicle: Vehicle,
        checkpoint: ResetCheckpoint,
        monitor: CollisionMonitor,
    ) -> Self {
        Self {
            id: id.into(),
            vehicle,
            checkpoint,
            monitor,
            collided: false,
        }
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.vehicle.body
    }

    /// Forward this tick's control signal to the vehicle.
    pub fn on_tick(&mut self, signal: ControlSignal) {
        apply_signal(signal, &mut self.vehicle);
    }

    /// Returns true when the contact caused a reset.
    pub fn on_collision(&mut self, event: &Collision, body: &mut RigidBody) -> bool {
        if !self.monitor.requires_reset(event) {
            return false;
        }

        info!(car = %self.id, tag = %event.surface_tag, "Car collided with {}.", event.other_name);
        self.reset(body);
        self.collided = true;
        true
    }

    pub fn reset(&mut self, body: &mut RigidBody) {
        reset_body(body, &self.checkpoint);
    }

    /// Whether a crash reset happened since the last call.
    pub fn take_collided(&mut self) -> bool {
        std::mem::take(&mut self.collided)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::VehicleConfig;

    fn car() -> Car {
        let checkpoint = ResetCheckpoint::from_yaw([2.0, 1.3, 8.0], 0.25);
        let vehicle = Vehicle::new(RigidBodyHandle::invalid(), VehicleConfig::default());
        Car::new("car-1", vehicle, checkpoint, CollisionMonitor::default())
    }

    fn moving_body() -> RigidBody {
        RigidBodyBuilder::dynamic()
            .translation(vector![30.0, 1.0, -12.0])
            .linvel(vector![0.0, 0.0, -15.0])
            .angvel(vector![0.0, -0.4, 0.0])
            .build()
    }

    #[test]
    fn wall_hit_resets_within_the_same_call() {
        let mut car = car();
        let mut body = moving_body();

        assert!(car.on_collision(&Collision::new("West wall", "wall"), &mut body));

        assert_eq!(*body.linvel(), Vector::zeros());
        assert_eq!(*body.angvel(), Vector::zeros());
        assert_eq!(*body.position(), car.checkpoint.pose());
        assert!(car.take_collided());
        assert!(!car.take_collided());
    }

    #[test]
    fn road_contact_leaves_the_body_alone() {
        let mut car = car();
        let mut body = moving_body();
        let before = (*body.position(), *body.linvel(), *body.angvel());

        assert!(!car.on_collision(&Collision::new("Ground", "road"), &mut body));

        assert_eq!((*body.position(), *body.linvel(), *body.angvel()), before);
        assert!(!car.take_collided());
    }

    #[test]
    fn several_crashes_in_one_tick_each_reset() {
        let mut car = car();
        let mut body = moving_body();

        assert!(car.on_collision(&Collision::new("Cone 1", "cone"), &mut body));
        let after_first = *body.position();
        assert!(car.on_collision(&Collision::new("Cone 2", "cone"), &mut body));

        assert_eq!(*body.position(), after_first);
        assert_eq!(*body.linvel(), Vector::zeros());
    }

    #[test]
    fn on_tick_reaches_the_vehicle() {
        let mut car = car();
        car.on_tick(ControlSignal::new(-0.5, -1.0));
        assert_eq!(car.vehicle.steer, -0.5);
        assert_eq!(car.vehicle.accelerate, 0.0);
        assert_eq!(car.vehicle.footbrake, 1.0);
    }
}
