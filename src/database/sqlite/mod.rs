//! # SQLite Database
//!
//! This module provides a durable database implementation over a single
//! SQLite file, keeping one table per solved tier plus a catalog table
//! recording which tiers were flushed completely. Read cursors open their
//! own connections, so parallel probing needs no shared state.

use anyhow::Context;
use anyhow::Result;
use rusqlite::Connection;
use rusqlite::Error::QueryReturnedNoRows;
use rusqlite::params;

use std::path::Path;
use std::path::PathBuf;

use crate::database::LoadedTier;
use crate::database::Probe;
use crate::database::Record;
use crate::database::SolvingTable;
use crate::database::TierStatus;
use crate::database::error::DatabaseError;
use crate::game::Position;
use crate::game::Tier;
use crate::game::Value;
use crate::solver::Remoteness;

/* DEFINITIONS */

type Namer = Box<dyn Fn(Tier) -> String + Send + Sync>;

/// A file-backed [`crate::database::Database`] engine.
pub struct Database {
    path: PathBuf,
    namer: Option<Namer>,
}

struct SqliteProbe {
    conn: Connection,
    select: String,
}

/* IMPLEMENTATION */

impl Database {
    /// Opens (creating if necessary) the store at `path` and ensures the
    /// tier catalog exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self {
            path: path.as_ref().to_path_buf(),
            namer: None,
        };

        let conn = db.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS solved \
            (tier INTEGER PRIMARY KEY, size INTEGER NOT NULL);",
            [],
        )
        .context("Failed to create tier catalog table.")?;

        Ok(db)
    }

    /// Derives tier table names through `namer` instead of numerically,
    /// which keeps stored artifacts legible for games that provide
    /// human-readable tier names.
    pub fn with_tier_names(
        mut self,
        namer: impl Fn(Tier) -> String + Send + Sync + 'static,
    ) -> Self {
        self.namer = Some(Box::new(namer));
        self
    }

    /* UTILITY */

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path).with_context(|| {
            format!("Failed to open database file {}.", self.path.display())
        })
    }

    fn table(&self, tier: Tier) -> String {
        let name = match &self.namer {
            Some(namer) => namer(tier),
            None => tier.to_string(),
        };

        format!("tier_{}", sqlize(&name))
    }

    fn catalog_size(&self, conn: &Connection, tier: Tier) -> Result<Option<u64>> {
        let row = conn.query_row(
            "SELECT size FROM solved WHERE tier = ?",
            [tier as i64],
            |row| row.get::<_, i64>(0),
        );

        match row {
            Ok(size) => Ok(Some(size as u64)),
            Err(QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to query tier catalog."),
        }
    }

    fn row_count(&self, conn: &Connection, tier: Tier) -> Result<Option<u64>> {
        let exists = conn.query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [self.table(tier)],
            |row| row.get::<_, String>(0),
        );

        match exists {
            Err(QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e).context("Failed to query table listing."),
            Ok(_) => (),
        }

        let count = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", self.table(tier)),
                [],
                |row| row.get::<_, i64>(0),
            )
            .context("Failed to count tier records.")?;

        Ok(Some(count as u64))
    }
}

impl crate::database::Database for Database {
    fn probe(&self, tier: Tier) -> Result<Box<dyn Probe + '_>> {
        match self.status(tier)? {
            TierStatus::Solved => (),
            TierStatus::Missing => {
                return Err(DatabaseError::MissingTier { tier }.into())
            },
            TierStatus::Corrupted => {
                return Err(DatabaseError::Corrupted {
                    hint: format!("Tier {tier} has an incomplete table."),
                }
                .into())
            },
        }

        Ok(Box::new(SqliteProbe {
            conn: self.connect()?,
            select: format!(
                "SELECT value, remoteness FROM {} WHERE position = ?",
                self.table(tier),
            ),
        }))
    }

    fn new_table(&self, tier: Tier, size: u64) -> Result<SolvingTable> {
        SolvingTable::new(tier, size)
    }

    fn flush(&self, table: &SolvingTable) -> Result<()> {
        let tier = table.tier();
        let name = self.table(tier);
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to begin flush transaction.")?;

        tx.execute(&format!("DROP TABLE IF EXISTS {name};"), [])
            .context("Failed to drop stale tier table.")?;

        tx.execute(
            &format!(
                "CREATE TABLE {name} (position INTEGER PRIMARY KEY, \
                value INTEGER NOT NULL, remoteness INTEGER NOT NULL);",
            ),
            [],
        )
        .context("Failed to create tier table.")?;

        {
            let mut insert = tx
                .prepare(&format!(
                    "INSERT INTO {name} (position, value, remoteness) \
                    VALUES (?, ?, ?)",
                ))
                .context("Failed to prepare tier record insertion.")?;

            for position in 0..table.size() {
                let record = table.get(position);
                insert
                    .execute(params![
                        position as i64,
                        record.value as i64,
                        record.remoteness as i64,
                    ])
                    .context("Failed to insert tier record.")?;
            }
        }

        tx.execute(
            "INSERT INTO solved (tier, size) VALUES (?, ?) \
            ON CONFLICT(tier) DO UPDATE SET size = excluded.size",
            params![tier as i64, table.size() as i64],
        )
        .context("Failed to catalog solved tier.")?;

        tx.commit()
            .context("Failed to commit flush transaction.")
    }

    fn load(&self, tier: Tier) -> Result<LoadedTier> {
        let size = match self.status(tier)? {
            TierStatus::Solved => self
                .catalog_size(&self.connect()?, tier)?
                .expect("Solved tier missing from catalog."),
            _ => return Err(DatabaseError::MissingTier { tier }.into()),
        };

        let conn = self.connect()?;
        let mut records = vec![0u32; size as usize];
        let mut select = conn
            .prepare(&format!(
                "SELECT position, value, remoteness FROM {}",
                self.table(tier),
            ))
            .context("Failed to prepare tier load query.")?;

        let mut rows = select
            .query([])
            .context("Failed to execute tier load query.")?;

        while let Some(row) = rows.next()? {
            let position = row.get::<_, i64>(0)? as usize;
            let record = Record {
                value: Value::try_from(row.get::<_, i64>(1)? as u8)
                    .map_err(|e| DatabaseError::Corrupted {
                        hint: e.to_string(),
                    })?,
                remoteness: row.get::<_, i64>(2)? as Remoteness,
            };

            records[position] = record.pack();
        }

        Ok(LoadedTier::from_packed(tier, records))
    }

    fn status(&self, tier: Tier) -> Result<TierStatus> {
        let conn = self.connect()?;
        let expected = match self.catalog_size(&conn, tier)? {
            None => return Ok(TierStatus::Missing),
            Some(size) => size,
        };

        match self.row_count(&conn, tier)? {
            Some(count) if count == expected => Ok(TierStatus::Solved),
            _ => Ok(TierStatus::Corrupted),
        }
    }
}

impl Probe for SqliteProbe {
    fn record(&mut self, position: Position) -> Result<Record> {
        let mut stmt = self
            .conn
            .prepare_cached(&self.select)
            .context("Failed to prepare tier record query.")?;

        let row = stmt.query_row([position as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        });

        match row {
            Ok((value, remoteness)) => Ok(Record {
                value: Value::try_from(value as u8).map_err(|e| {
                    DatabaseError::Corrupted {
                        hint: e.to_string(),
                    }
                })?,
                remoteness: remoteness as Remoteness,
            }),
            Err(QueryReturnedNoRows) => Err(DatabaseError::Corrupted {
                hint: format!("Record for position {position} is absent."),
            }
            .into()),
            Err(e) => Err(e).context("Failed to query tier record."),
        }
    }
}

/* UTILITY */

/// Transform input string into a valid SQL identifier.
fn sqlize(s: &str) -> String {
    s.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {

    use tempfile::tempdir;

    use super::*;
    use crate::database::Database as _;

    #[test]
    fn flush_then_probe_load_and_status() -> Result<()> {
        let dir = tempdir()?;
        let db = Database::new(dir.path().join("solutions.db"))?;
        assert_eq!(db.status(1)?, TierStatus::Missing);

        let table = db.new_table(1, 8)?;
        table.set(5, Value::Lose, 3);
        db.flush(&table)?;

        assert_eq!(db.status(1)?, TierStatus::Solved);
        let mut probe = db.probe(1)?;
        assert_eq!(
            probe.record(5)?,
            Record {
                value: Value::Lose,
                remoteness: 3
            }
        );

        assert_eq!(probe.record(7)?, Record::UNDECIDED);
        let loaded = db.load(1)?;
        assert_eq!(loaded.size(), 8);
        assert_eq!(loaded.record(5)?.remoteness, 3);
        Ok(())
    }

    #[test]
    fn tier_names_influence_table_identifiers() -> Result<()> {
        let dir = tempdir()?;
        let db = Database::new(dir.path().join("named.db"))?
            .with_tier_names(|tier| format!("{tier} pieces"));

        assert_eq!(db.table(4), "tier_4_pieces");
        let table = db.new_table(4, 2)?;
        db.flush(&table)?;
        assert_eq!(db.status(4)?, TierStatus::Solved);
        Ok(())
    }
}
