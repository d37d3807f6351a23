/// Physics layer - deterministic fixed-step body simulation.
///
/// This module is organized into:
/// - **components**: Body components (transform history, rigidbody, colliders)
/// - **resources**: Clock, tick and render-delta resources
/// - **systems**: Clock driving and velocity integration
/// - **collision**: AABBs and world-bounds reflection
/// - **debug**: Draw commands for an external renderer
/// - **snapshot**: Save/rewind of the full simulation state

use bevy::ecs::schedule::ScheduleLabel;
use bevy::prelude::*;

use crate::config::PhysicsConfig;
use crate::math::lookup;

pub mod collision;
pub mod components;
pub mod debug;
pub mod resources;
pub mod snapshot;
pub mod systems;

pub use components::*;
pub use resources::*;

/// Schedule run once per simulation step by [`systems::advance_physics_clock`].
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicsStep;

/// Per-frame ordering in `Update`.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum PhysicsSet {
    Clock,  // Advancing the clock and running due steps
    Render, // Interpolation fraction and draw commands
}

/// Per-step ordering inside [`PhysicsStep`].
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum StepSet {
    Integration,
}

pub struct PhysicsPlugin {
    pub config: PhysicsConfig,
    /// Drive [`ElapsedTicks`] from `Time<Real>`. When off, the host writes
    /// [`ElapsedTicks`] before each update.
    pub use_real_time: bool,
}

impl Default for PhysicsPlugin {
    fn default() -> Self {
        Self {
            config: PhysicsConfig::default(),
            use_real_time: true,
        }
    }
}

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        // Tables must exist before the first step
        lookup::warm_up();

        app.insert_resource(self.config.clone());
        app.insert_resource(PhysicsClock::from_config(&self.config));
        app.init_resource::<ElapsedTicks>();
        app.init_resource::<PhysicsTick>();
        app.init_resource::<StepIterations>();
        app.init_resource::<RenderDelta>();
        app.init_resource::<PhysicsStats>();
        app.init_resource::<debug::DrawList>();

        app.init_schedule(PhysicsStep);
        app.add_systems(PhysicsStep, systems::apply_velocity.in_set(StepSet::Integration));

        app.configure_sets(Update, (PhysicsSet::Clock, PhysicsSet::Render).chain());

        if self.use_real_time {
            app.add_systems(
                Update,
                systems::sync_elapsed_ticks
                    .in_set(PhysicsSet::Clock)
                    .before(systems::advance_physics_clock),
            );
        }
        app.add_systems(Update, systems::advance_physics_clock.in_set(PhysicsSet::Clock));
        app.add_systems(
            Update,
            (
                systems::update_render_delta,
                debug::collect_draw_commands.run_if(debug::debug_draw_enabled),
            )
                .chain()
                .in_set(PhysicsSet::Render),
        );

        info!(
            "PhysicsPlugin: {} clock ticks per step, enforce_frequency = {}",
            self.config.tick_frequency, self.config.enforce_frequency
        );
    }
}
