/// Clock driving and integration systems.

use bevy::prelude::*;

use crate::config::PhysicsConfig;
use crate::math::FixedPoint;
use crate::profile_log;
use super::collision::reflect_step;
use super::components::*;
use super::resources::*;
use super::PhysicsStep;

const MICROS_PER_SECOND: u128 = 1_000_000;

// ============================================================================
// Clock
// ============================================================================

/// Converts real time since startup into clock ticks.
pub fn sync_elapsed_ticks(
    time: Res<Time<Real>>,
    config: Res<PhysicsConfig>,
    mut elapsed: ResMut<ElapsedTicks>,
) {
    let ticks = time.elapsed().as_micros() * u128::from(config.clock_ticks_per_second) / MICROS_PER_SECOND;
    elapsed.0 = u64::try_from(ticks).unwrap_or(u64::MAX);
}

/// Feeds [`ElapsedTicks`] to the [`PhysicsClock`] and runs [`PhysicsStep`]
/// once per step that falls due.
pub fn advance_physics_clock(world: &mut World) {
    let elapsed = world.resource::<ElapsedTicks>().0;

    let runs = world.resource_scope(|world, mut clock: Mut<PhysicsClock>| {
        clock.advance(elapsed, |step| {
            world.resource_mut::<PhysicsTick>().0 = step.tick;
            world.resource_mut::<StepIterations>().0 = step.iterations;
            world.run_schedule(PhysicsStep);
        })
    });

    world.resource_mut::<PhysicsStats>().record_frame(runs);
    if runs > 1 {
        debug!("Ran {} physics steps in one frame", runs);
    }
}

/// Interpolation fraction for this frame's rendering.
pub fn update_render_delta(clock: Res<PhysicsClock>, mut delta: ResMut<RenderDelta>) {
    delta.0 = clock.fraction();
}

// ============================================================================
// Integration
// ============================================================================

/// Moves every non-kinematic body by `direction * speed` for the steps this
/// run stands for, bouncing off the world bounds if configured.
#[cfg_attr(not(feature = "perf_stats"), allow(unused_variables))]
pub fn apply_velocity(
    config: Res<PhysicsConfig>,
    iterations: Res<StepIterations>,
    tick: Res<PhysicsTick>,
    mut stats: ResMut<PhysicsStats>,
    mut query: Query<(&mut SimTransform, &mut SimRigidbody)>,
) {
    let steps = FixedPoint::from_int(iterations.0 as i64);
    let mut moved = 0usize;

    for (mut transform, mut body) in query.iter_mut() {
        if body.kinematic {
            continue;
        }

        let velocity = body.direction * body.speed;
        let position = transform.position();
        let target = position + velocity * steps / config.simulations_per_second;

        let next = match config.bounds.as_ref().and_then(|bounds| reflect_step(bounds, position, target)) {
            Some(reflection) => {
                if reflection.flip_x {
                    body.direction.x = -body.direction.x;
                }
                if reflection.flip_y {
                    body.direction.y = -body.direction.y;
                }
                transform
                    .advanced(reflection.target)
                    .with_midpoint(Midpoint::Waypoint(reflection.contact))
            }
            None => transform.advanced(target),
        };

        *transform = next;
        body.velocity = velocity;
        moved += 1;
    }

    stats.last_step_bodies = moved;
    profile_log!(tick, "[APPLY_VELOCITY] tick {} | Bodies moved: {}", tick.0, moved);
}
