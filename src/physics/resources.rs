/// Resource definitions for the physics layer.

use bevy::prelude::*;

use crate::config::PhysicsConfig;
use crate::math::FixedPoint;
use crate::schedule::ScheduledAction;

// ============================================================================
// Clock
// ============================================================================

/// Accumulator that decides when [`super::PhysicsStep`] runs.
#[derive(Resource, Debug, Clone, Deref, DerefMut)]
pub struct PhysicsClock(pub ScheduledAction);

impl PhysicsClock {
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self(ScheduledAction::with_frequency(config.tick_frequency, config.enforce_frequency))
    }
}

/// Elapsed clock ticks fed to the [`PhysicsClock`] this frame. Written from
/// real time by the plugin, or by the host when it drives the clock itself.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElapsedTicks(pub u64);

/// Tick currently being simulated (1-based). Zero until the first step.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicsTick(pub u64);

/// Number of steps the current [`super::PhysicsStep`] run stands for.
/// Above one only when the clock does not enforce its frequency.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepIterations(pub u64);

impl Default for StepIterations {
    fn default() -> Self {
        Self(1)
    }
}

/// Progress toward the next tick, in `[0, 1)`.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderDelta(pub FixedPoint);

// ============================================================================
// Statistics
// ============================================================================

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct PhysicsStats {
    /// Schedule runs since startup.
    pub step_runs: u64,
    /// Schedule runs during the last frame.
    pub last_frame_runs: u64,
    /// Most runs seen in a single frame.
    pub max_frame_runs: u64,
    /// Bodies integrated by the latest step.
    pub last_step_bodies: usize,
}

impl PhysicsStats {
    pub fn record_frame(&mut self, runs: u64) {
        self.step_runs += runs;
        self.last_frame_runs = runs;
        self.max_frame_runs = self.max_frame_runs.max(runs);
    }
}
