// src/physics.rs

use std::collections::HashMap;

use rapier3d::crossbeam::channel::{unbounded, Receiver};
use rapier3d::parry::query::PointQuery;
use rapier3d::prelude::*;
use tracing::{debug, info, warn};

use crate::car::Car;
use crate::collision::{Collision, CollisionMonitor};
use crate::config::{ObstacleConfig, ServerConfig};
use crate::control::ControlSignal;
use crate::debug_builders::DebugRay;
use crate::perception::{CarKinematics, Observation, PerceptionEncoder, RayCaster};
use crate::reset::ResetCheckpoint;
use crate::vehicle::{Vehicle, VehicleConfig};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);
const GROUP_OBSTACLE: Group = Group::from_bits_truncate(0b0100);

/// Cars only touch the scene, never each other; rays see what a chassis touches.
fn chassis_groups() -> InteractionGroups {
    InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_OBSTACLE)
}

/// Name and tag of a static collider, read by the collision monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub name: String,
    pub tag: String,
}

/// Ray queries against the scene, ignoring the car doing the looking.
pub struct WorldRays<'a> {
    pub query_pipeline: &'a QueryPipeline,
    pub bodies: &'a RigidBodySet,
    pub colliders: &'a ColliderSet,
    pub exclude: RigidBodyHandle,
}

impl RayCaster for WorldRays<'_> {
    fn cast(&self, origin: Point<Real>, dir: Vector<Real>, max_dist: Real) -> Option<Real> {
        // A collider that already contains the origin is not an obstacle along the ray.
        let outside = |_: ColliderHandle, collider: &Collider| {
            !collider.shape().contains_point(collider.position(), &origin)
        };
        let filter = QueryFilter::default()
            .groups(chassis_groups())
            .exclude_rigid_body(self.exclude)
            .predicate(&outside);
        self.query_pipeline
            .cast_ray(
                self.bodies,
                self.colliders,
                &Ray::new(origin, dir),
                max_dist,
                true,
                filter,
            )
            .map(|(_, toi)| toi)
            .filter(|toi| *toi > 0.0)
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,                 // gravity vector
    pub pipeline: PhysicsPipeline,             // physics pipeline
    pub integration_parameters: IntegrationParameters,
    pub island_manager: IslandManager,         // manages islands of bodies
    pub broad_phase: DefaultBroadPhase,        // broad-phase collision detection
    pub narrow_phase: NarrowPhase,             // collision detection
    pub bodies: RigidBodySet,                  // for rigid bodies
    pub colliders: ColliderSet,                // for collision shapes
    pub joints: ImpulseJointSet,               // for constraints
    pub multibody_joints: MultibodyJointSet,   // for articulated bodies
    pub ccd: CCDSolver,                        // continuous collision detection
    pub query_pipeline: QueryPipeline,         // for raycasting
    pub cars: HashMap<String, Car>,            // car id → car
    pub surfaces: HashMap<ColliderHandle, Surface>, // static collider → name/tag
    pub collider_to_car: HashMap<ColliderHandle, String>, // chassis collider → car id
    pub encoder: PerceptionEncoder,
    pub checkpoint: ResetCheckpoint,
    pub vehicle_config: VehicleConfig,
    drivable_tag: String,
    event_collector: ChannelEventCollector,
    collision_recv: Receiver<CollisionEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
}

impl PhysicsWorld {
    pub fn new(config: &ServerConfig) -> Self {
        let (collision_send, collision_recv) = unbounded();
        let (contact_force_send, contact_force_recv) = unbounded();

        let mut world = Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            cars: HashMap::new(),
            surfaces: HashMap::new(),
            collider_to_car: HashMap::new(),
            encoder: PerceptionEncoder::new(config.perception.clone()),
            checkpoint: config.checkpoint,
            vehicle_config: config.vehicle.clone(),
            drivable_tag: config.drivable_tag.clone(),
            event_collector: ChannelEventCollector::new(collision_send, contact_force_send),
            collision_recv,
            contact_force_recv,
        };

        world.insert_ground(config.ground_half_size);
        for obstacle in &config.obstacles {
            world.add_obstacle(obstacle);
        }
        world.query_pipeline.update(&world.colliders);

        info!(
            bodies = world.bodies.len(),
            colliders = world.colliders.len(),
            "scene built"
        );
        world
    }

    /// Large static box whose top face is y = 0, tagged as the drivable surface.
    fn insert_ground(&mut self, half_size: f32) {
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -1.0, 0.0])
            .build();
        let ground_handle = self.bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(half_size, 1.0, half_size)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(ground_collider, ground_handle, &mut self.bodies);

        self.surfaces.insert(
            collider,
            Surface {
                name: "Ground".to_string(),
                tag: self.drivable_tag.clone(),
            },
        );
    }

    pub fn add_obstacle(&mut self, obstacle: &ObstacleConfig) -> ColliderHandle {
        let [x, y, z] = obstacle.position;
        let [hx, hy, hz] = obstacle.half_extents;

        let rb = RigidBodyBuilder::fixed().translation(vector![x, y, z]).build();
        let handle = self.bodies.insert(rb);
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_OBSTACLE, GROUP_CHASSIS))
            .restitution(0.0)
            .build();
        let collider = self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        self.surfaces.insert(
            collider,
            Surface {
                name: obstacle.name.clone(),
                tag: obstacle.tag.clone(),
            },
        );
        self.query_pipeline.update(&self.colliders);
        debug!(name = %obstacle.name, tag = %obstacle.tag, "obstacle added");
        collider
    }

    /// Spawn a car at the checkpoint. Box chassis, yaw-only rotation.
    pub fn spawn_car(&mut self, id: &str) -> RigidBodyHandle {
        let config = self.vehicle_config.clone();

        let rb = RigidBodyBuilder::dynamic()
            .position(self.checkpoint.pose())
            .linear_damping(config.linear_damping)
            .angular_damping(config.angular_damping)
            .enabled_rotations(false, true, false)
            .ccd_enabled(true)
            .can_sleep(false)
            .build();

        let [hx, hy, hz] = config.chassis_half_extents;
        let [cx, cy, cz] = config.chassis_com_offset;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![cx, cy, cz])
            .collision_groups(chassis_groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .mass(config.mass)
            .friction(0.0) // grip comes from the vehicle model
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(0.0)
            .build();

        let handle = self.bodies.insert(rb);
        let collider = self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.collider_to_car.insert(collider, id.to_string());

        let car = Car::new(
            id,
            Vehicle::new(handle, config),
            self.checkpoint,
            CollisionMonitor::new(self.drivable_tag.clone()),
        );
        self.cars.insert(id.to_string(), car);

        info!(car = %id, body = ?handle, "spawned car at checkpoint");
        handle
    }

    pub fn remove_car(&mut self, id: &str) {
        let Some(car) = self.cars.remove(id) else { return };

        self.collider_to_car.retain(|_, owner| owner.as_str() != id);
        self.bodies.remove(
            car.body(),
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
        info!(car = %id, "removed car");
    }

    pub fn car(&self, id: &str) -> Option<&Car> {
        self.cars.get(id)
    }

    pub fn car_body(&self, id: &str) -> Option<&RigidBody> {
        self.cars.get(id).and_then(|car| self.bodies.get(car.body()))
    }

    /// Controller adapter hook: hand this tick's signal to the car.
    pub fn drive_car(&mut self, id: &str, signal: ControlSignal) {
        if let Some(car) = self.cars.get_mut(id) {
            car.on_tick(signal);
        }
    }

    /// External reset, e.g. at the start of a new episode.
    pub fn reset_car(&mut self, id: &str) -> bool {
        let Some(car) = self.cars.get_mut(id) else { return false };
        let Some(body) = self.bodies.get_mut(car.body()) else { return false };
        car.reset(body);
        true
    }

    /// Whether the car crashed (and was reset) since the last call.
    pub fn take_collided(&mut self, id: &str) -> bool {
        self.cars.get_mut(id).is_some_and(Car::take_collided)
    }

    /// Observation for one car, built from the current scene.
    pub fn observe(&mut self, id: &str) -> Option<(Observation, Vec<DebugRay>)> {
        let car = self.cars.get(id)?;
        let body = self.bodies.get(car.body())?;

        self.query_pipeline.update(&self.colliders);
        let rays = WorldRays {
            query_pipeline: &self.query_pipeline,
            bodies: &self.bodies,
            colliders: &self.colliders,
            exclude: car.body(),
        };
        Some(self.encoder.encode(&CarKinematics::of(body), &rays))
    }

    /// Apply vehicle controls (throttle + steering) to each car.
    fn apply_vehicle_controls(&mut self, dt: Real) {
        for car in self.cars.values_mut() {
            if let Some(body) = self.bodies.get_mut(car.body()) {
                car.vehicle.apply_controls(body, dt);
            }
        }
    }

    /// Deliver new contacts to the cars involved.
    fn handle_collisions(&mut self) {
        while let Ok(event) = self.collision_recv.try_recv() {
            let CollisionEvent::Started(h1, h2, _) = event else { continue };

            for (mine, other) in [(h1, h2), (h2, h1)] {
                let Some(car_id) = self.collider_to_car.get(&mine) else { continue };
                let Some(surface) = self.surfaces.get(&other) else { continue };
                let Some(car) = self.cars.get_mut(car_id) else { continue };
                let Some(body) = self.bodies.get_mut(car.body()) else { continue };

                let collision = Collision::new(surface.name.clone(), surface.tag.clone());
                car.on_collision(&collision, body);
            }
        }

        // Contact forces are not used; keep the channel from growing.
        while self.contact_force_recv.try_recv().is_ok() {}
    }

    /// Cars that left the world or went non-finite go back to their checkpoint.
    fn reset_exploded_cars(&mut self) {
        for car in self.cars.values_mut() {
            let Some(body) = self.bodies.get_mut(car.body()) else { continue };
            let pos = *body.translation();

            let bad = !pos.x.is_finite() || !pos.y.is_finite() || !pos.z.is_finite()
                || pos.x.abs() > 1_000.0 || pos.y.abs() > 1_000.0 || pos.z.abs() > 1_000.0;

            if bad {
                car.reset(body);
                warn!(car = %car.id, position = ?pos, "reset exploding car to checkpoint");
            }
        }
    }

    pub fn step(&mut self, dt: Real) {
        // 1) Driver intent → chassis impulses
        self.apply_vehicle_controls(dt);

        // 2) Step physics
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        // 3) Contacts from this step, then the safety net
        self.handle_collisions();
        self.reset_exploded_cars();
    }
}
