#![allow(dead_code)]

use bevy::prelude::*;
use lockstep2d::config::{BoundsConfig, InitialConfig, PhysicsConfig};
use lockstep2d::math::{FixedPoint, FixedPointVector2};
use lockstep2d::physics::{BodyId, ElapsedTicks, PhysicsPlugin, SimRigidbody, SimTransform};

/// 20 steps per second on a 400 Hz clock: 20 clock ticks per step.
pub fn test_config(enforce_frequency: bool, bounds: Option<BoundsConfig>) -> PhysicsConfig {
    let initial = InitialConfig {
        simulations_per_second: 20,
        clock_ticks_per_second: 400,
        enforce_frequency,
        bounds,
        debug_draw: true,
        ..default()
    };
    PhysicsConfig::from_initial(&initial).unwrap()
}

pub fn square_bounds(size: f32) -> BoundsConfig {
    BoundsConfig { min_x: 0.0, min_y: 0.0, max_x: size, max_y: size }
}

/// Headless app whose clock is driven through [`ElapsedTicks`].
pub fn test_app(config: PhysicsConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(PhysicsPlugin { config, use_real_time: false });
    app
}

pub fn advance_to(app: &mut App, elapsed: u64) {
    app.world_mut().resource_mut::<ElapsedTicks>().0 = elapsed;
    app.update();
}

pub fn p(x: i32, y: i32) -> FixedPointVector2 {
    FixedPointVector2::from_ints(x, y)
}

pub fn spawn_body(app: &mut App, id: u32, position: FixedPointVector2, direction: FixedPointVector2, speed: i64) -> Entity {
    app.world_mut()
        .spawn((
            BodyId(id),
            SimTransform::new(position),
            SimRigidbody::new(direction, FixedPoint::from_int(speed)),
        ))
        .id()
}

/// Deterministic scene of `count` bodies with assorted headings and speeds
/// inside a 100x100 world.
pub fn spawn_scene(app: &mut App, count: u32) {
    let mut angle = FixedPoint::ZERO;
    let step = FixedPoint::from_ratio(7, 5);
    for i in 0..count {
        let (sin, cos) = angle.sin_cos();
        let position = p(10 + (i as i32 * 13) % 80, 10 + (i as i32 * 29) % 80);
        let speed = 15 + 10 * i64::from(i % 9);
        spawn_body(app, i, position, FixedPointVector2::new(cos, sin), speed);
        angle = angle + step;
    }
}

pub fn transform_of(app: &mut App, entity: Entity) -> SimTransform {
    *app.world().get::<SimTransform>(entity).unwrap()
}
