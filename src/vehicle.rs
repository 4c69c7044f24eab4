use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::control::Actuator;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub mass: f32,              // kg
    pub engine_force: f32,      // N
    pub brake_force: f32,       // N
    pub reverse_ratio: f32,     // fraction of engine force available in reverse
    pub max_speed: f32,         // m/s
    pub linear_damping: f32,    // drag
    pub angular_damping: f32,   // rotational drag
    pub lateral_grip: f32,      // 0..1, share of sideways velocity removed per tick
    pub handbrake_grip: f32,    // lateral grip while the handbrake is fully on

    // --- Geometry ---
    pub wheelbase: f32,         // meters (front axle to rear axle)
    pub max_steer_angle: f32,   // radians
    pub max_steer_rate: f32,    // radians / sec

    // --- Chassis geometry ---
    pub chassis_half_extents: [f32; 3], // [hx, hy, hz] meters
    pub chassis_com_offset: [f32; 3],   // local offset from collider center
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mass: 1350.0,
            engine_force: 3200.0,
            brake_force: 8000.0,
            reverse_ratio: 0.5,
            max_speed: 55.0,
            linear_damping: 0.08,
            angular_damping: 0.6,
            lateral_grip: 0.9,
            handbrake_grip: 0.2,

            wheelbase: 2.5,
            max_steer_angle: 0.6, // ~34 degrees
            max_steer_rate: 2.5,

            chassis_half_extents: [1.0, 0.35, 2.1],
            chassis_com_offset: [0.0, -0.15, 0.0],
        }
    }
}

/// Chassis forward in local space. Right is +X.
pub fn local_forward() -> Vector<Real> {
    vector![0.0, 0.0, -1.0]
}

pub fn local_right() -> Vector<Real> {
    vector![1.0, 0.0, 0.0]
}

/// Black-box car controller: stores clamped driver intent and turns it into
/// impulses on the chassis once per tick.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub body: RigidBodyHandle,
    pub config: VehicleConfig,
    pub steer: f32,       // -1.0 .. 1.0
    pub accelerate: f32,  // 0.0 .. 1.0
    pub footbrake: f32,   // 0.0 .. 1.0 (brake when rolling forward, reverse otherwise)
    pub handbrake: f32,   // 0.0 .. 1.0
    pub steer_angle: f32, // current steering angle (radians)
}

impl Vehicle {
    pub fn new(body: RigidBodyHandle, config: VehicleConfig) -> Self {
        Self {
            body,
            config,
            steer: 0.0,
            accelerate: 0.0,
            footbrake: 0.0,
            handbrake: 0.0,
            steer_angle: 0.0,
        }
    }

    /// Turn stored intent into chassis impulses for one tick of length `dt`.
    pub fn apply_controls(&mut self, body: &mut RigidBody, dt: Real) {
        let cfg = &self.config;

        let rot = *body.rotation();
        let forward = rot * local_forward();
        let right = rot * local_right();
        let linvel = *body.linvel();
        let mass = body.mass();

        let forward_speed = linvel.dot(&forward);
        let lateral_speed = linvel.dot(&right);

        // Steering: speed-sensitive target, rate limited
        let steer_scale = (1.0 - forward_speed.abs() / 30.0).clamp(0.35, 1.0);
        let target = self.steer * cfg.max_steer_angle * steer_scale;
        let max_step = cfg.max_steer_rate * dt;
        self.steer_angle += (target - self.steer_angle).clamp(-max_step, max_step);

        // Longitudinal
        let mut drive_force = 0.0;
        if forward_speed < cfg.max_speed {
            drive_force += self.accelerate * cfg.engine_force;
        }

        let mut brake_force = self.handbrake * cfg.brake_force;
        if forward_speed > 0.5 {
            brake_force += self.footbrake * cfg.brake_force;
        } else if -forward_speed < cfg.max_speed * cfg.reverse_ratio {
            drive_force -= self.footbrake * cfg.engine_force * cfg.reverse_ratio;
        }

        // Brakes oppose motion but never push the car backwards
        let brake_impulse = (brake_force * dt).min(forward_speed.abs() * mass);
        let longitudinal = drive_force * dt - brake_impulse * forward_speed.signum();
        body.apply_impulse(forward * longitudinal, true);

        // Lateral grip: bleed sideways velocity
        let grip = cfg.lateral_grip + (cfg.handbrake_grip - cfg.lateral_grip) * self.handbrake;
        body.apply_impulse(-right * (lateral_speed * mass * grip.clamp(0.0, 1.0)), true);

        // Yaw from a bicycle model. Positive steer turns right, which is a
        // negative rotation about +Y.
        let yaw_rate = if self.steer_angle.abs() > 1e-4 {
            -forward_speed * self.steer_angle.tan() / cfg.wheelbase
        } else {
            0.0
        };
        body.set_angvel(vector![0.0, yaw_rate, 0.0], true);
    }
}

impl Actuator for Vehicle {
    fn move_car(&mut self, steer: f32, accelerate: f32, footbrake: f32, handbrake: f32) {
        self.steer = steer.clamp(-1.0, 1.0);
        self.accelerate = accelerate.clamp(0.0, 1.0);
        self.footbrake = -footbrake.clamp(-1.0, 0.0);
        self.handbrake = handbrake.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{apply_signal, ControlSignal};

    fn vehicle() -> Vehicle {
        Vehicle::new(RigidBodyHandle::invalid(), VehicleConfig::default())
    }

    #[test]
    fn positive_vertical_accelerates_without_braking() {
        let mut v = vehicle();
        apply_signal(ControlSignal::new(0.3, 0.8), &mut v);
        assert_eq!(v.steer, 0.3);
        assert_eq!(v.accelerate, 0.8);
        assert_eq!(v.footbrake, 0.0);
        assert_eq!(v.handbrake, 0.0);
    }

    #[test]
    fn negative_vertical_becomes_footbrake() {
        let mut v = vehicle();
        apply_signal(ControlSignal::new(-1.0, -0.6), &mut v);
        assert_eq!(v.steer, -1.0);
        assert_eq!(v.accelerate, 0.0);
        assert_eq!(v.footbrake, 0.6);
    }

    #[test]
    fn actuation_clamps_out_of_range_input() {
        let mut v = vehicle();
        v.move_car(4.0, 9.0, -3.0, 2.0);
        assert_eq!(v.steer, 1.0);
        assert_eq!(v.accelerate, 1.0);
        assert_eq!(v.footbrake, 1.0);
        assert_eq!(v.handbrake, 1.0);
    }
}
