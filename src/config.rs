use std::num::NonZeroU64;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{FixedPoint, FixedPointVector2, MathError};
use crate::physics::collision::Aabb;

pub const DEFAULT_CONFIG_PATH: &str = "assets/physics_config.ron";

const DEFAULT_TICK_FREQUENCY: NonZeroU64 = match NonZeroU64::new(20_000) {
    Some(frequency) => frequency,
    None => panic!("default tick frequency is zero"),
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be positive")]
    InvalidRate(&'static str),
    #[error("{clock_ticks_per_second} clock ticks per second is less than one per simulation step at {simulations_per_second} steps per second")]
    ZeroFrequency {
        clock_ticks_per_second: u64,
        simulations_per_second: u32,
    },
    #[error("world bounds must have min < max on both axes")]
    InvalidBounds,
    #[error("value is not representable in fixed point: {0}")]
    NotRepresentable(#[from] MathError),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// World rectangle in world units.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct BoundsConfig {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

/// Static configuration loaded once at startup. Values are floats for
/// readability and are converted to fixed point exactly once by
/// [`PhysicsConfig::from_initial`]. Changing them mid-run breaks determinism.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct InitialConfig {
    // Scheduling
    pub simulations_per_second: u32,
    pub clock_ticks_per_second: u64,
    pub enforce_frequency: bool,

    // World
    pub bounds: Option<BoundsConfig>,

    // Debug drawing
    pub debug_draw: bool,
    pub marker_size: i32,

    // Demo scene
    pub demo_bodies: u32,
    pub demo_duration_secs: f32,
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            simulations_per_second: 50,
            clock_ticks_per_second: 1_000_000,
            enforce_frequency: true,
            bounds: Some(BoundsConfig {
                min_x: 0.0,
                min_y: 0.0,
                max_x: 1280.0,
                max_y: 720.0,
            }),
            debug_draw: true,
            marker_size: 3,
            demo_bodies: 64,
            demo_duration_secs: 5.0,
        }
    }
}

pub fn load_initial_config(path: impl AsRef<Path>) -> Result<InitialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(ron::from_str::<InitialConfig>(&contents)?)
}

/// Loads the config at `path`, falling back to the defaults on any error.
pub fn load_initial_config_or_default(path: impl AsRef<Path>) -> InitialConfig {
    let path = path.as_ref();
    match load_initial_config(path) {
        Ok(config) => {
            info!("Loaded initial config from {}", path.display());
            config
        }
        Err(e) => {
            error!("Failed to load initial config from {}: {}", path.display(), e);
            error!("Using default InitialConfig");
            InitialConfig::default()
        }
    }
}

// ============================================================================
// Physics Configuration
// ============================================================================

/// Validated, fixed-point form of [`InitialConfig`] used by the simulation.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub simulations_per_second: FixedPoint,
    pub clock_ticks_per_second: u64,
    /// Clock ticks per simulation step.
    pub tick_frequency: NonZeroU64,
    pub enforce_frequency: bool,
    pub bounds: Option<Aabb>,
    pub debug_draw: bool,
    pub marker_size: i32,
}

impl PhysicsConfig {
    pub fn from_initial(initial: &InitialConfig) -> Result<Self, ConfigError> {
        if initial.simulations_per_second == 0 {
            return Err(ConfigError::InvalidRate("simulations_per_second"));
        }
        if initial.clock_ticks_per_second == 0 {
            return Err(ConfigError::InvalidRate("clock_ticks_per_second"));
        }

        let frequency = initial.clock_ticks_per_second / u64::from(initial.simulations_per_second);
        let tick_frequency = NonZeroU64::new(frequency).ok_or(ConfigError::ZeroFrequency {
            clock_ticks_per_second: initial.clock_ticks_per_second,
            simulations_per_second: initial.simulations_per_second,
        })?;

        let bounds = initial.bounds.map(bounds_to_aabb).transpose()?;

        Ok(Self {
            simulations_per_second: FixedPoint::from_int(i64::from(initial.simulations_per_second)),
            clock_ticks_per_second: initial.clock_ticks_per_second,
            tick_frequency,
            enforce_frequency: initial.enforce_frequency,
            bounds,
            debug_draw: initial.debug_draw,
            marker_size: initial.marker_size,
        })
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            simulations_per_second: FixedPoint::from_int(50),
            clock_ticks_per_second: 1_000_000,
            tick_frequency: DEFAULT_TICK_FREQUENCY,
            enforce_frequency: true,
            bounds: None,
            debug_draw: false,
            marker_size: 3,
        }
    }
}

fn bounds_to_aabb(bounds: BoundsConfig) -> Result<Aabb, ConfigError> {
    let min = FixedPointVector2::new(FixedPoint::from_f32(bounds.min_x)?, FixedPoint::from_f32(bounds.min_y)?);
    let max = FixedPointVector2::new(FixedPoint::from_f32(bounds.max_x)?, FixedPoint::from_f32(bounds.max_y)?);
    if min.x >= max.x || min.y >= max.y {
        return Err(ConfigError::InvalidBounds);
    }
    Ok(Aabb::from_min_max(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_converts() {
        let config = PhysicsConfig::from_initial(&InitialConfig::default()).unwrap();
        assert_eq!(config.tick_frequency.get(), 20_000);
        assert_eq!(config.simulations_per_second, FixedPoint::from_int(50));
        let bounds = config.bounds.unwrap();
        assert_eq!(bounds.max, FixedPointVector2::from_ints(1280, 720));
    }

    #[test]
    fn test_default_physics_config_matches_default_rates() {
        let config = PhysicsConfig::default();
        assert_eq!(config.tick_frequency.get(), 20_000);
    }

    #[test]
    fn test_parse_ron() {
        let config: InitialConfig = ron::from_str(
            "(simulations_per_second: 20, clock_ticks_per_second: 400, enforce_frequency: false, bounds: None)",
        )
        .unwrap();
        assert_eq!(config.simulations_per_second, 20);
        assert!(!config.enforce_frequency);
        assert_eq!(config.bounds, None);
        // Omitted fields keep their defaults
        assert_eq!(config.marker_size, 3);

        let physics = PhysicsConfig::from_initial(&config).unwrap();
        assert_eq!(physics.tick_frequency.get(), 20);
    }

    #[test]
    fn test_zero_rates_rejected() {
        let config = InitialConfig { simulations_per_second: 0, ..default() };
        assert!(matches!(PhysicsConfig::from_initial(&config), Err(ConfigError::InvalidRate(_))));

        let config = InitialConfig { clock_ticks_per_second: 0, ..default() };
        assert!(matches!(PhysicsConfig::from_initial(&config), Err(ConfigError::InvalidRate(_))));
    }

    #[test]
    fn test_step_shorter_than_clock_tick_rejected() {
        let config = InitialConfig {
            simulations_per_second: 60,
            clock_ticks_per_second: 30,
            ..default()
        };
        assert!(matches!(PhysicsConfig::from_initial(&config), Err(ConfigError::ZeroFrequency { .. })));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let config = InitialConfig {
            bounds: Some(BoundsConfig { min_x: 10.0, min_y: 0.0, max_x: 5.0, max_y: 10.0 }),
            ..default()
        };
        assert!(matches!(PhysicsConfig::from_initial(&config), Err(ConfigError::InvalidBounds)));
    }

    #[test]
    fn test_non_finite_bounds_rejected() {
        let config = InitialConfig {
            bounds: Some(BoundsConfig { min_x: f32::NAN, min_y: 0.0, max_x: 5.0, max_y: 10.0 }),
            ..default()
        };
        assert!(matches!(PhysicsConfig::from_initial(&config), Err(ConfigError::NotRepresentable(_))));
    }

    #[test]
    fn test_load_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.ron");
        assert!(matches!(load_initial_config(&missing), Err(ConfigError::Io(_))));
        assert_eq!(load_initial_config_or_default(&missing), InitialConfig::default());

        let broken = dir.path().join("broken.ron");
        std::fs::write(&broken, "(simulations_per_second: \"fast\")").unwrap();
        assert!(matches!(load_initial_config(&broken), Err(ConfigError::Parse(_))));
        assert_eq!(load_initial_config_or_default(&broken), InitialConfig::default());
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = load_initial_config(DEFAULT_CONFIG_PATH).unwrap();
        PhysicsConfig::from_initial(&config).unwrap();
    }
}
