//! # Database Module
//!
//! Contains the interfaces the tier solver consumes for persisting and
//! retrieving per-tier solution tables, together with the shared in-memory
//! structures handed across that boundary. Database engines implementing
//! [`Database`] own the on-disk layout entirely; the solver only relies on
//! solved tiers being readable back value-exactly.

use anyhow::Result;

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use crate::database::error::DatabaseError;
use crate::game::Position;
use crate::game::Tier;
use crate::game::Value;
use crate::solver::Remoteness;

/* UTILITY MODULES */

pub mod error;

/* ENGINE MODULES */

pub mod volatile;
pub mod sqlite;

/* DEFINITIONS */

/// The solved information associated with a single position: its value, and
/// the number of plies to the nearest terminal under optimal play. The
/// remoteness of [`Value::Draw`] and [`Value::Undecided`] records carries no
/// meaning and is stored as zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Record {
    pub value: Value,
    pub remoteness: Remoteness,
}

/// The condition of one tier's solution table within a database.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TierStatus {
    /// The tier was solved and its records are readable.
    Solved,

    /// The tier's table exists but cannot be trusted (e.g. an interrupted
    /// flush left it incomplete).
    Corrupted,

    /// No table exists for the tier.
    Missing,
}

/// A dense in-memory solution table for one tier being solved.
///
/// Each record is packed into a single atomic word, so concurrent writers on
/// disjoint positions need no locking, and a reader never observes a torn
/// value/remoteness pair. The solver guarantees each position is written at
/// most once.
pub struct SolvingTable {
    tier: Tier,
    records: Vec<AtomicU32>,
}

/// A read-only copy of one solved tier's table, resident in memory.
pub struct LoadedTier {
    tier: Tier,
    records: Vec<u32>,
}

/* INTERFACES */

/// A cursor for reading individual records of one solved tier.
///
/// Probes are cheap to create and not shared: parallel loops obtain one
/// handle per task so that engines can keep per-handle state (connections,
/// prepared statements) without synchronization.
pub trait Probe {
    /// Returns the record stored for `position` in the probe's tier.
    fn record(&mut self, position: Position) -> Result<Record>;
}

/// A store of per-tier solution tables.
pub trait Database: Send + Sync {
    /// Returns a new read cursor over the solved table of `tier`. Fails if
    /// the tier is not [`TierStatus::Solved`].
    fn probe(&self, tier: Tier) -> Result<Box<dyn Probe + '_>>;

    /// Allocates a zeroed in-memory solving table for `tier` with `size`
    /// record slots.
    fn new_table(&self, tier: Tier, size: u64) -> Result<SolvingTable>;

    /// Materializes `table` as the solution of its tier, replacing any
    /// previous table for that tier.
    fn flush(&self, table: &SolvingTable) -> Result<()>;

    /// Reads the entire solved table of `tier` into memory.
    fn load(&self, tier: Tier) -> Result<LoadedTier>;

    /// Reports the condition of `tier`'s table.
    fn status(&self, tier: Tier) -> Result<TierStatus>;
}

/* RECORD PACKING */

impl Record {
    /// A record whose value is [`Value::Undecided`].
    pub const UNDECIDED: Record = Record {
        value: Value::Undecided,
        remoteness: 0,
    };

    pub(crate) fn pack(self) -> u32 {
        (self.remoteness << 8) | self.value as u32
    }

    pub(crate) fn unpack(raw: u32) -> Result<Record> {
        let value = Value::try_from((raw & 0xFF) as u8).map_err(|_| {
            DatabaseError::Corrupted {
                hint: format!("Unknown value byte in packed record {raw:#x}."),
            }
        })?;

        Ok(Record {
            value,
            remoteness: raw >> 8,
        })
    }
}

/* IN-MEMORY TABLES */

impl SolvingTable {
    /// Allocates a table of `size` undecided records for `tier`. Fails with
    /// a distinguished error if the allocation cannot be satisfied.
    pub fn new(tier: Tier, size: u64) -> Result<Self> {
        let mut records = Vec::new();
        records
            .try_reserve_exact(size as usize)
            .map_err(|_| DatabaseError::OutOfMemory {
                tier,
                bytes: size * std::mem::size_of::<AtomicU32>() as u64,
            })?;

        records.resize_with(size as usize, || AtomicU32::new(0));
        Ok(Self { tier, records })
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn size(&self) -> u64 {
        self.records.len() as u64
    }

    /// Writes both halves of `position`'s record in one atomic store.
    ///
    /// Callers must ensure each position has a unique writer; the table
    /// resolves no write-write conflicts.
    pub fn set(&self, position: Position, value: Value, remoteness: Remoteness) {
        let record = Record { value, remoteness };
        self.records[position as usize].store(record.pack(), Ordering::Relaxed);
    }

    /// Reads `position`'s record. Concurrent with writers to *other*
    /// positions only.
    pub fn get(&self, position: Position) -> Record {
        let raw = self.records[position as usize].load(Ordering::Relaxed);
        Record::unpack(raw).expect("Solving table only stores valid records.")
    }

    /// Copies the table contents out as packed words, for engine flushing.
    pub(crate) fn snapshot(&self) -> Vec<u32> {
        self.records
            .iter()
            .map(|cell| cell.load(Ordering::Relaxed))
            .collect()
    }
}

impl LoadedTier {
    pub(crate) fn from_packed(tier: Tier, records: Vec<u32>) -> Self {
        Self { tier, records }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn size(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn record(&self, position: Position) -> Result<Record> {
        Record::unpack(self.records[position as usize])
    }

    /// Iterates all records in position order.
    pub fn records(&self) -> impl Iterator<Item = Result<Record>> + '_ {
        self.records
            .iter()
            .map(|&raw| Record::unpack(raw))
    }
}
