/// Save and rewind support.
///
/// The clock state plus every body's transform and rigidbody fully determine
/// how the simulation evolves for given future elapsed inputs, so that is all
/// a snapshot holds. Files are zlib-compressed bincode.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bevy::prelude::*;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::{ClockSnapshot, ScheduleError};
use super::components::{BodyId, SimRigidbody, SimTransform};
use super::resources::{ElapsedTicks, PhysicsClock, PhysicsTick};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("world has no PhysicsClock; is PhysicsPlugin added?")]
    MissingClock,
    #[error("snapshot refers to body {0:?} which is not in the world")]
    UnknownBody(BodyId),
    #[error("snapshot clock does not fit this world: {0}")]
    Clock(#[from] ScheduleError),
    #[error("failed to access snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode or decode snapshot: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub transform: SimTransform,
    pub rigidbody: SimRigidbody,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub clock: ClockSnapshot,
    /// Sorted by id.
    pub bodies: Vec<BodySnapshot>,
}

pub fn capture_snapshot(world: &mut World) -> Result<WorldSnapshot, SnapshotError> {
    let clock = world
        .get_resource::<PhysicsClock>()
        .ok_or(SnapshotError::MissingClock)?
        .snapshot();

    let mut query = world.query::<(&BodyId, &SimTransform, &SimRigidbody)>();
    let mut bodies: Vec<BodySnapshot> = query
        .iter(world)
        .map(|(id, transform, rigidbody)| BodySnapshot {
            id: *id,
            transform: *transform,
            rigidbody: *rigidbody,
        })
        .collect();
    bodies.sort_by_key(|body| body.id);

    Ok(WorldSnapshot { clock, bodies })
}

/// Rewinds the clock and every body in `snapshot`. Nothing is changed if any
/// body is missing from the world or the clock state does not fit the
/// configured step frequency. Bodies not in the snapshot are left as they are.
pub fn restore_snapshot(world: &mut World, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
    world
        .get_resource::<PhysicsClock>()
        .ok_or(SnapshotError::MissingClock)?
        .check_snapshot(&snapshot.clock)?;

    let mut query = world.query::<(Entity, &BodyId)>();
    let entities: HashMap<BodyId, Entity> = query.iter(world).map(|(entity, id)| (*id, entity)).collect();

    let targets = snapshot
        .bodies
        .iter()
        .map(|body| {
            entities
                .get(&body.id)
                .map(|entity| (*entity, body))
                .ok_or(SnapshotError::UnknownBody(body.id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (entity, body) in targets {
        let mut entity = world.entity_mut(entity);
        entity.insert((body.transform, body.rigidbody));
    }

    world.resource_mut::<PhysicsClock>().restore(snapshot.clock)?;
    world.resource_mut::<PhysicsTick>().0 = snapshot.clock.current_tick;
    if let Some(mut elapsed) = world.get_resource_mut::<ElapsedTicks>() {
        elapsed.0 = snapshot.clock.last_elapsed;
    }

    info!(
        "Restored snapshot at tick {} with {} bodies",
        snapshot.clock.current_tick,
        snapshot.bodies.len()
    );
    Ok(())
}

pub fn save_snapshot(path: impl AsRef<Path>, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, snapshot)?;
    encoder.finish()?.flush()?;
    Ok(())
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<WorldSnapshot, SnapshotError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut decoder = ZlibDecoder::new(reader);
    let snapshot: WorldSnapshot = bincode::deserialize_from(&mut decoder)?;
    Ok(snapshot)
}
