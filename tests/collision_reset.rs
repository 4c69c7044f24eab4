//! Crash detection and the reset protocol, driven through full physics steps.

use drive_agent::{ControlSignal, ObstacleConfig, PhysicsWorld, ServerConfig};
use rapier3d::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn world_with(obstacles: Vec<ObstacleConfig>) -> PhysicsWorld {
    let cfg = ServerConfig {
        obstacles,
        ..ServerConfig::default()
    };
    PhysicsWorld::new(&cfg)
}

fn assert_at_checkpoint(world: &PhysicsWorld, id: &str) {
    let body = world.car_body(id).unwrap();
    assert_eq!(*body.linvel(), Vector::zeros());
    assert_eq!(*body.angvel(), Vector::zeros());
    assert_eq!(*body.position(), world.checkpoint.pose());
}

#[test]
fn landing_on_the_road_is_not_a_crash() {
    let mut world = world_with(Vec::new());
    world.spawn_car("car");

    for _ in 0..120 {
        world.step(DT);
    }

    assert!(!world.take_collided("car"));
    let y = world.car_body("car").unwrap().translation().y;
    assert!(y < 1.0 && y > 0.0, "car should rest on the ground, y = {y}");
}

#[test]
fn touching_an_obstacle_resets_in_the_same_step() {
    // Overlaps the chassis nose at spawn.
    let cone = ObstacleConfig::new("Cone 1", "cone", [0.0, 1.0, -1.5], [0.5, 0.5, 0.5]);
    let mut world = world_with(vec![cone]);
    world.spawn_car("car");

    world.step(DT);

    assert!(world.take_collided("car"));
    assert_at_checkpoint(&world, "car");
}

#[test]
fn driving_into_a_wall_sends_the_car_back() {
    let wall = ObstacleConfig::new("North wall", "wall", [0.0, 2.0, -12.0], [10.0, 2.0, 0.5]);
    let mut world = world_with(vec![wall]);
    world.spawn_car("car");

    let mut crashed = false;
    for _ in 0..600 {
        world.drive_car("car", ControlSignal::new(0.0, 1.0));
        world.step(DT);
        if world.take_collided("car") {
            crashed = true;
            break;
        }
    }

    assert!(crashed, "car never reached the wall");
    assert_at_checkpoint(&world, "car");
}

#[test]
fn throttle_moves_the_car_forward() {
    let mut world = world_with(Vec::new());
    world.spawn_car("car");
    for _ in 0..60 {
        world.step(DT);
    }
    let start_z = world.car_body("car").unwrap().translation().z;

    for _ in 0..60 {
        world.drive_car("car", ControlSignal::new(0.0, 1.0));
        world.step(DT);
    }

    let body = world.car_body("car").unwrap();
    assert!(body.translation().z < start_z - 0.5);
    assert!(body.linvel().z < 0.0);
    assert!(!world.take_collided("car"));
}

#[test]
fn external_reset_matches_a_crash_reset_and_is_idempotent() {
    let mut world = world_with(Vec::new());
    world.spawn_car("car");
    for _ in 0..90 {
        world.drive_car("car", ControlSignal::new(0.5, 1.0));
        world.step(DT);
    }

    assert!(world.reset_car("car"));
    assert_at_checkpoint(&world, "car");
    assert!(world.reset_car("car"));
    assert_at_checkpoint(&world, "car");

    // Not a crash: the reward hook must not see one.
    assert!(!world.take_collided("car"));
    assert!(!world.reset_car("nobody"));
}

#[test]
fn runaway_car_is_pulled_back_to_the_checkpoint() {
    let mut world = world_with(Vec::new());
    let handle = world.spawn_car("car");
    world.bodies[handle].set_translation(vector![5_000.0, 1.3, 0.0], true);

    world.step(DT);

    assert_at_checkpoint(&world, "car");
    assert!(!world.take_collided("car"));
}

#[test]
fn cars_spawned_together_do_not_crash_into_each_other() {
    let mut world = world_with(Vec::new());
    world.spawn_car("a");
    world.spawn_car("b");

    for _ in 0..30 {
        world.step(DT);
    }

    assert!(!world.take_collided("a"));
    assert!(!world.take_collided("b"));
}

#[test]
fn removed_car_is_gone_from_the_world() {
    let mut world = world_with(Vec::new());
    world.spawn_car("car");
    let bodies_before = world.bodies.len();

    world.remove_car("car");

    assert!(world.car("car").is_none());
    assert_eq!(world.bodies.len(), bodies_before - 1);
    assert!(world.collider_to_car.is_empty());
    world.step(DT);
}
