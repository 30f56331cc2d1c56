//! # Volatile Database
//!
//! This module provides a trivial database implementation backed by a
//! volatile in-memory data structure arrangement. It is the engine of choice
//! for tests and for solving pipelines whose results are consumed
//! immediately rather than persisted.

use anyhow::Result;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::database::LoadedTier;
use crate::database::Probe;
use crate::database::Record;
use crate::database::SolvingTable;
use crate::database::TierStatus;
use crate::database::error::DatabaseError;
use crate::game::Position;
use crate::game::Tier;

/* DEFINITIONS */

/// An in-memory [`crate::database::Database`] keeping one packed-record
/// vector per solved tier.
#[derive(Default)]
pub struct Database {
    tiers: RwLock<HashMap<Tier, Arc<Vec<u32>>>>,
}

struct VolatileProbe {
    records: Arc<Vec<u32>>,
}

/* IMPLEMENTATION */

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, tier: Tier) -> Result<Arc<Vec<u32>>> {
        self.tiers
            .read()
            .expect("Volatile tier map lock poisoned.")
            .get(&tier)
            .cloned()
            .ok_or_else(|| DatabaseError::MissingTier { tier }.into())
    }
}

impl crate::database::Database for Database {
    fn probe(&self, tier: Tier) -> Result<Box<dyn Probe + '_>> {
        Ok(Box::new(VolatileProbe {
            records: self.table(tier)?,
        }))
    }

    fn new_table(&self, tier: Tier, size: u64) -> Result<SolvingTable> {
        SolvingTable::new(tier, size)
    }

    fn flush(&self, table: &SolvingTable) -> Result<()> {
        self.tiers
            .write()
            .expect("Volatile tier map lock poisoned.")
            .insert(table.tier(), Arc::new(table.snapshot()));

        Ok(())
    }

    fn load(&self, tier: Tier) -> Result<LoadedTier> {
        let records = self.table(tier)?;
        Ok(LoadedTier::from_packed(tier, records.to_vec()))
    }

    fn status(&self, tier: Tier) -> Result<TierStatus> {
        let known = self
            .tiers
            .read()
            .expect("Volatile tier map lock poisoned.")
            .contains_key(&tier);

        if known {
            Ok(TierStatus::Solved)
        } else {
            Ok(TierStatus::Missing)
        }
    }
}

impl Probe for VolatileProbe {
    fn record(&mut self, position: Position) -> Result<Record> {
        Record::unpack(self.records[position as usize])
    }
}
