pub mod config;
pub mod math;
pub mod physics;
pub mod schedule;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Logs a message every 100 physics ticks when the `perf_stats` feature is
/// enabled. `$tick` is anything with a `.0: u64` tick count, such as
/// `Res<PhysicsTick>`.
///
/// Without the feature this expands to an empty block and the arguments are
/// not evaluated.
///
/// # Example
/// ```ignore
/// profile_log!(tick, "Integrated {} bodies", query.iter().len());
/// ```
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {
        if $tick.0 % 100 == 0 {
            bevy::prelude::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {};
}
