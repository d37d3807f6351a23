//! Fixed-timestep tick accumulator.
//!
//! [`ScheduledAction`] turns a monotonically non-decreasing elapsed-time
//! counter (in any unit, called clock ticks here) into a sequence of discrete
//! simulation steps. Leftover time carries over between calls, so frames of
//! any length add up to exactly the same steps.

use std::num::NonZeroU64;

use bevy::log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{FixedPoint, FRAC_BITS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("step frequency must be non-zero")]
    ZeroFrequency,
    #[error("snapshot carries {remaining_delta} leftover ticks, not below the step frequency {frequency}")]
    RemainderTooLarge { remaining_delta: u64, frequency: u64 },
}

/// One invocation of the step callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickStep {
    /// `current_tick` after this step.
    pub tick: u64,
    /// Steps this invocation stands for. Always 1 when the frequency is
    /// enforced; may be larger otherwise.
    pub iterations: u64,
}

/// Everything needed to resume a clock exactly where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub current_tick: u64,
    pub remaining_delta: u64,
    pub last_elapsed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledAction {
    frequency: NonZeroU64,
    enforce_frequency: bool,
    last_elapsed: u64,
    remaining_delta: u64,
    current_tick: u64,
}

impl ScheduledAction {
    /// `frequency` is the number of clock ticks per simulation step.
    pub fn new(frequency: u64, enforce_frequency: bool) -> Result<Self, ScheduleError> {
        let frequency = NonZeroU64::new(frequency).ok_or(ScheduleError::ZeroFrequency)?;
        Ok(Self::with_frequency(frequency, enforce_frequency))
    }

    pub fn with_frequency(frequency: NonZeroU64, enforce_frequency: bool) -> Self {
        Self {
            frequency,
            enforce_frequency,
            last_elapsed: 0,
            remaining_delta: 0,
            current_tick: 0,
        }
    }

    /// Feeds the clock and invokes `step` for the steps that became due.
    ///
    /// With `enforce_frequency`, `step` runs once per frequency-sized chunk,
    /// in order, and `remaining_delta` ends below the frequency. Without it,
    /// all due steps are collapsed into a single call whose
    /// [`TickStep::iterations`] says how many steps it covers.
    ///
    /// Returns the number of times `step` was invoked.
    pub fn advance<F>(&mut self, elapsed: u64, mut step: F) -> u64
    where
        F: FnMut(TickStep),
    {
        if elapsed < self.last_elapsed {
            warn!(
                "Clock went backwards ({} -> {}), ignoring the difference",
                self.last_elapsed, elapsed
            );
        }
        self.remaining_delta += elapsed.saturating_sub(self.last_elapsed);
        self.last_elapsed = elapsed;

        let frequency = self.frequency.get();
        let mut invocations = 0;

        if self.enforce_frequency {
            while self.remaining_delta >= frequency {
                self.current_tick += 1;
                self.remaining_delta -= frequency;
                invocations += 1;
                step(TickStep { tick: self.current_tick, iterations: 1 });
            }
        } else {
            let iterations = self.remaining_delta / frequency;
            if iterations >= 1 {
                self.current_tick += iterations;
                self.remaining_delta -= frequency * iterations;
                invocations = 1;
                if iterations > 1 {
                    debug!("Skipping ahead {} steps to tick {}", iterations, self.current_tick);
                }
                step(TickStep { tick: self.current_tick, iterations });
            }
        }

        invocations
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn remaining_delta(&self) -> u64 {
        self.remaining_delta
    }

    pub fn last_elapsed(&self) -> u64 {
        self.last_elapsed
    }

    pub fn frequency(&self) -> NonZeroU64 {
        self.frequency
    }

    pub fn enforce_frequency(&self) -> bool {
        self.enforce_frequency
    }

    /// Progress toward the next step, `remaining_delta / frequency`.
    ///
    /// In `[0, 1)` whenever the frequency is enforced.
    pub fn fraction(&self) -> FixedPoint {
        let bits = (u128::from(self.remaining_delta) << FRAC_BITS) / u128::from(self.frequency.get());
        FixedPoint::from_bits(i64::try_from(bits).unwrap_or(i64::MAX))
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            current_tick: self.current_tick,
            remaining_delta: self.remaining_delta,
            last_elapsed: self.last_elapsed,
        }
    }

    /// Fails if `snapshot` could not have been taken from a clock with this
    /// frequency: its remainder must be below one step.
    pub fn check_snapshot(&self, snapshot: &ClockSnapshot) -> Result<(), ScheduleError> {
        let frequency = self.frequency.get();
        if snapshot.remaining_delta >= frequency {
            return Err(ScheduleError::RemainderTooLarge {
                remaining_delta: snapshot.remaining_delta,
                frequency,
            });
        }
        Ok(())
    }

    /// Resumes from `snapshot`. The clock is untouched if the snapshot fails
    /// [`Self::check_snapshot`].
    pub fn restore(&mut self, snapshot: ClockSnapshot) -> Result<(), ScheduleError> {
        self.check_snapshot(&snapshot)?;
        self.current_tick = snapshot.current_tick;
        self.remaining_delta = snapshot.remaining_delta;
        self.last_elapsed = snapshot.last_elapsed;
        Ok(())
    }
}
