//! Build-once lookup tables for irrational operations.
//!
//! Each [`Operation`] owns exactly one table mapping a quantised integer key to
//! a quantised fixed-point result. Tables are computed once from a
//! higher-precision reference and are immutable afterwards, so every read
//! during the simulation is a plain array index.
//!
//! The process-wide tables live in [`OnceLock`]s. [`table`] builds on first
//! access; [`warm_up`] forces all of them up front and [`install`] accepts a
//! table loaded from disk before first use.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::OnceLock;

use bevy::log::{debug, info};
use fixed::types::I64F64;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;


/// Fractional bits carried by a table key.
pub const KEY_FRAC_BITS: u32 = 12;

/// Fractional bits carried by a table value.
pub const VALUE_FRAC_BITS: u32 = 16;

/// Deterministic function served by a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Square root of a mantissa in `[1, 4]`.
    Sqrt,
    /// Sine of an angle in `[0, π/2]`.
    Sin,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Sqrt, Operation::Sin];

    /// Every key that can occur for this operation's valid input.
    pub fn domain(self) -> RangeInclusive<i32> {
        match self {
            Operation::Sqrt => (1 << KEY_FRAC_BITS)..=(4 << KEY_FRAC_BITS),
            // key of HALF_PI (102_944 >> 4)
            Operation::Sin => 0..=6434,
        }
    }

    /// Reference value for `key`, rounded half up to 16 fractional bits.
    fn reference(self, key: i32) -> i32 {
        match self {
            Operation::Sqrt => {
                let shift = I64F64::FRAC_NBITS - KEY_FRAC_BITS;
                let root = I64F64::from_bits((key as i128) << shift).sqrt();
                let drop = I64F64::FRAC_NBITS - VALUE_FRAC_BITS;
                ((root.to_bits() + (1i128 << (drop - 1))) >> drop) as i32
            }
            Operation::Sin => {
                let angle = key as f64 / f64::from(1u32 << KEY_FRAC_BITS);
                (angle.sin() * f64::from(1u32 << VALUE_FRAC_BITS)).round() as i32
            }
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum TableError {
    #[error("{operation:?} table is missing key {key}")]
    MissingKey { operation: Operation, key: i32 },
    #[error("{operation:?} table has key {key} outside its domain")]
    UnexpectedKey { operation: Operation, key: i32 },
    #[error("{operation:?} table has key {key} more than once")]
    DuplicateKey { operation: Operation, key: i32 },
    #[error("{0:?} table was already built or installed")]
    AlreadyInstalled(Operation),
    #[error("failed to access table file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode or decode table: {0}")]
    Codec(#[from] bincode::Error),
}

// ============================================================================
// Lookup Table
// ============================================================================

/// Immutable key to value mapping for one operation.
///
/// Keys are dense over [`Operation::domain`], so the table is stored as a
/// vector offset by the first key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTable {
    operation: Operation,
    first_key: i32,
    values: Vec<i32>,
}

/// Persisted form of a table: an operation tag and its key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDto {
    pub operation: Operation,
    pub data: Vec<(i32, i32)>,
}

impl LookupTable {
    /// Enumerates the operation's whole domain once. Building twice yields
    /// identical tables.
    pub fn build(operation: Operation) -> Self {
        let domain = operation.domain();
        let first_key = *domain.start();
        let values: Vec<i32> = domain.map(|key| operation.reference(key)).collect();
        info!("Built {:?} lookup table with {} entries", operation, values.len());
        Self { operation, first_key, values }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: i32) -> Option<i32> {
        let index = usize::try_from(key.checked_sub(self.first_key)?).ok()?;
        self.values.get(index).copied()
    }

    /// Value for `key`. A key outside the domain is a programming error.
    pub fn lookup(&self, key: i32) -> i32 {
        match self.get(key) {
            Some(value) => value,
            None => panic!(
                "key {} outside the {:?} table domain {:?}",
                key,
                self.operation,
                self.operation.domain()
            ),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.first_key..).zip(self.values.iter().copied())
    }

    pub fn to_dto(&self) -> TableDto {
        TableDto {
            operation: self.operation,
            data: self.entries().collect(),
        }
    }

    /// Rebuilds a table from its persisted form. Every key of the domain must
    /// appear exactly once; insertion order does not matter.
    pub fn from_dto(dto: TableDto) -> Result<Self, TableError> {
        let operation = dto.operation;
        let domain = operation.domain();
        let first_key = *domain.start();
        let mut slots: Vec<Option<i32>> = vec![None; domain.clone().count()];

        for (key, value) in dto.data {
            if !domain.contains(&key) {
                return Err(TableError::UnexpectedKey { operation, key });
            }
            let slot = &mut slots[(key - first_key) as usize];
            if slot.replace(value).is_some() {
                return Err(TableError::DuplicateKey { operation, key });
            }
        }

        let values = slots
            .into_iter()
            .zip(domain)
            .map(|(slot, key)| slot.ok_or_else(|| TableError::MissingKey { operation, key }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { operation, first_key, values })
    }
}

// ============================================================================
// Process-Wide Tables
// ============================================================================

static SQRT_TABLE: OnceLock<LookupTable> = OnceLock::new();
static SIN_TABLE: OnceLock<LookupTable> = OnceLock::new();

fn slot(operation: Operation) -> &'static OnceLock<LookupTable> {
    match operation {
        Operation::Sqrt => &SQRT_TABLE,
        Operation::Sin => &SIN_TABLE,
    }
}

/// The process-wide table for `operation`, built on first access.
pub fn table(operation: Operation) -> &'static LookupTable {
    slot(operation).get_or_init(|| LookupTable::build(operation))
}

/// Supplies a precomputed table. Must happen before the first read of that
/// operation.
pub fn install(table: LookupTable) -> Result<(), TableError> {
    let operation = table.operation;
    slot(operation)
        .set(table)
        .map_err(|_| TableError::AlreadyInstalled(operation))?;
    debug!("Installed {:?} lookup table", operation);
    Ok(())
}

/// Builds every table so none is built inside the simulation loop.
pub fn warm_up() {
    for operation in Operation::ALL {
        table(operation);
    }
}

// ============================================================================
// Persistence
// ============================================================================

pub fn save_table(path: impl AsRef<Path>, table: &LookupTable) -> Result<(), TableError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, &table.to_dto())?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}

pub fn load_table(path: impl AsRef<Path>) -> Result<LookupTable, TableError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut decoder = ZlibDecoder::new(reader);
    let dto: TableDto = bincode::deserialize_from(&mut decoder)?;
    LookupTable::from_dto(dto)
}
