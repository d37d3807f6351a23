use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;

use lockstep2d::config::{self, PhysicsConfig, DEFAULT_CONFIG_PATH};
use lockstep2d::math::{FixedPoint, FixedPointVector2};
use lockstep2d::physics::debug::DrawList;
use lockstep2d::physics::{
    BodyId, BoxCollider, CircleCollider, PhysicsPlugin, PhysicsStats, PhysicsTick, SimRigidbody, SimTransform,
};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_DIR: &str = "logs";
const LOG_PREFIX: &str = "lockstep2d";
const KEPT_LOG_FILES: usize = 25;
const DEFAULT_LOG_FILTER: &str = "bevy_ecs=info,lockstep2d=info";

/// Routes tracing output to stdout and to a per-run file under `logs/`.
/// Returns the path of the new log file.
fn setup_file_logging() -> Result<PathBuf, std::io::Error> {
    let log_dir = Path::new(LOG_DIR);
    fs::create_dir_all(log_dir)?;
    prune_run_logs(log_dir, KEPT_LOG_FILES);

    let started = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let file_name = format!("{LOG_PREFIX}_{started}.log");
    let file_writer = RollingFileAppender::new(Rotation::NEVER, log_dir, &file_name);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stdout).with_target(false))
        .init();

    Ok(log_dir.join(file_name))
}

/// Deletes the oldest run logs so at most `keep` remain.
fn prune_run_logs(log_dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    let mut run_logs: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_PREFIX) && name.ends_with(".log"))
        })
        .collect();
    let excess = run_logs.len().saturating_sub(keep);
    if excess == 0 {
        return;
    }

    run_logs.sort_by_key(|entry| entry.metadata().and_then(|meta| meta.modified()).ok());
    for entry in &run_logs[..excess] {
        let _ = fs::remove_file(entry.path());
    }
}

// ============================================================================
// Demo Scene
// ============================================================================

#[derive(Resource, Debug, Clone)]
struct DemoSettings {
    bodies: u32,
    duration: Duration,
    center: FixedPointVector2,
}

/// Golden angle in radians.
const SPIRAL_STEP: FixedPoint = FixedPoint::from_bits(157_284);

/// Lays bodies out on a spiral around the world centre, each moving
/// tangentially. Every body is placed from integer maths only, so two runs
/// spawn bit-identical scenes.
fn spawn_demo_bodies(mut commands: Commands, settings: Res<DemoSettings>) {
    let mut angle = FixedPoint::ZERO;

    for i in 0..settings.bodies {
        let (sin, cos) = angle.sin_cos();
        let radius = FixedPoint::from_int(10 + 4 * i64::from(i));
        let position = settings.center + FixedPointVector2::new(cos, sin) * radius;
        let direction = FixedPointVector2::new(-sin, cos);
        let speed = FixedPoint::from_int(40 + 15 * i64::from(i % 7));

        let rigidbody = if i % 8 == 7 {
            SimRigidbody::kinematic()
        } else {
            SimRigidbody::new(direction, speed)
        };

        let mut body = commands.spawn((BodyId(i), SimTransform::new(position), rigidbody));
        if i % 3 == 0 {
            body.insert(BoxCollider::new(FixedPointVector2::from_ints(4, 4), FixedPointVector2::ZERO));
        } else if i % 2 == 0 {
            body.insert(CircleCollider::new(FixedPointVector2::ZERO, FixedPoint::from_int(5)));
        }

        angle = angle + SPIRAL_STEP;
    }

    info!("Spawned {} demo bodies", settings.bodies);
}

fn report_progress(
    time: Res<Time<Real>>,
    tick: Res<PhysicsTick>,
    stats: Res<PhysicsStats>,
    draw_list: Res<DrawList>,
    mut last_second: Local<u64>,
) {
    let second = time.elapsed().as_secs();
    if second > *last_second {
        *last_second = second;
        info!(
            "[DEMO] {}s | tick {} | steps run {} | max steps per frame {} | draw commands {}",
            second,
            tick.0,
            stats.step_runs,
            stats.max_frame_runs,
            draw_list.commands.len()
        );
    }
}

fn exit_after_duration(
    time: Res<Time<Real>>,
    settings: Res<DemoSettings>,
    tick: Res<PhysicsTick>,
    mut exit: MessageWriter<AppExit>,
) {
    if time.elapsed() >= settings.duration {
        info!("Demo finished at tick {}", tick.0);
        exit.write(AppExit::Success);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_file = setup_file_logging()?;
    println!("lockstep2d - logging to {}", log_file.display());

    let initial = config::load_initial_config_or_default(DEFAULT_CONFIG_PATH);
    let physics_config = PhysicsConfig::from_initial(&initial)?;

    let center = physics_config
        .bounds
        .map(|bounds| bounds.center())
        .unwrap_or(FixedPointVector2::ZERO);
    let settings = DemoSettings {
        bodies: initial.demo_bodies,
        duration: Duration::try_from_secs_f32(initial.demo_duration_secs).unwrap_or(Duration::ZERO),
        center,
    };

    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0))))
        .add_plugins(PhysicsPlugin {
            config: physics_config,
            use_real_time: true,
        })
        .insert_resource(settings)
        .add_systems(Startup, spawn_demo_bodies)
        .add_systems(Update, (report_progress, exit_after_duration))
        .run();

    Ok(())
}
