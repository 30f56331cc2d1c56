//! # Acyclic Tier Solver Module
//!
//! This module implements the solver of choice for tiers declared free of
//! in-tier cycles: every child tier is loaded into memory, and the tier is
//! relaxed to a fixed point one remoteness layer at a time (wins and losses
//! first, then ties). This trades the loopy solver's reverse-graph and
//! frontier bookkeeping for the memory to hold child tables, which is
//! preferable wherever the game's structure permits it.

use anyhow::Result;
use rayon::prelude::*;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::database::LoadedTier;
use crate::database::Record;
use crate::database::SolvingTable;
use crate::game::Tier;
use crate::game::TierPosition;
use crate::game::Value;
use crate::game::error::GameError;
use crate::solver::Context;
use crate::solver::REMOTENESS_MAX;
use crate::solver::Remoteness;
use crate::solver::SCAN_CHUNK;
use crate::solver::error::SolverError;

/* DEFINITIONS */

/// Which fixed point a sweep is advancing.
#[derive(Clone, Copy)]
enum Mode {
    /// Wins and losses, layered by remoteness.
    Decisive,

    /// Ties, layered by remoteness, after all wins and losses settled.
    Tie,
}

/// Read access to every record a sweep may need: the in-progress table for
/// in-tier children, and the loaded tables of child tiers for the rest.
struct Children<'a> {
    ctx: &'a Context<'a>,
    table: &'a SolvingTable,
    loaded: &'a HashMap<Tier, LoadedTier>,
}

/* SOLVER */

/// Solves `ctx.tier` by layered value iteration and flushes its table.
pub fn solve(ctx: &Context) -> Result<()> {
    let clock = Instant::now();
    let size = ctx.game.tier_size(ctx.tier);
    log::info!(
        "solving tier {} ({} positions, value iteration)",
        ctx.game.tier_name(ctx.tier),
        size,
    );

    let mut loaded = HashMap::new();
    let mut max_decisive: Remoteness = 0;
    let mut max_tie: Remoteness = 0;
    for child in ctx.game.child_tiers(ctx.tier) {
        let canonical = ctx.game.canonical_tier(child);
        if loaded.contains_key(&canonical) {
            continue;
        }

        let tier = ctx.db.load(canonical)?;
        for record in tier.records() {
            let record = record?;
            match record.value {
                Value::Win | Value::Lose => {
                    max_decisive = max_decisive.max(record.remoteness)
                },
                Value::Tie => max_tie = max_tie.max(record.remoteness),
                _ => (),
            }
        }

        loaded.insert(canonical, tier);
    }

    let table = ctx.db.new_table(ctx.tier, size)?;
    seed(ctx, &table)?;

    let children = Children {
        ctx,
        table: &table,
        loaded: &loaded,
    };

    relax(ctx, &table, &children, Mode::Decisive, max_decisive)?;
    relax(ctx, &table, &children, Mode::Tie, max_tie)?;
    drop(loaded);

    invert(&table);
    ctx.db.flush(&table)?;
    log::info!(
        "solved tier {} in {:.2?}",
        ctx.game.tier_name(ctx.tier),
        clock.elapsed(),
    );

    Ok(())
}

/* SOLVING PHASES */

/// Writes primitives at remoteness zero and transiently marks illegal and
/// non-canonical slots as draws, to be inverted after iteration (positions
/// still undecided then are the true draws).
fn seed(ctx: &Context, table: &SolvingTable) -> Result<()> {
    let size = table.size();
    let chunks = size.div_ceil(SCAN_CHUNK);
    (0..chunks)
        .into_par_iter()
        .try_for_each(|chunk| -> Result<()> {
            let start = chunk * SCAN_CHUNK;
            let end = size.min(start + SCAN_CHUNK);
            for position in start..end {
                let state = TierPosition {
                    tier: ctx.tier,
                    position,
                };

                if !ctx.game.is_legal(state)
                    || ctx.game.canonical_position(state) != position
                {
                    table.set(position, Value::Draw, 0);
                    continue;
                }

                match ctx.game.primitive(state) {
                    Value::Undecided => (),
                    Value::Draw => {
                        return Err(GameError::ApiViolation {
                            hint: format!(
                                "Primitive classification of position \
                                {position} is a draw.",
                            ),
                        }
                        .into())
                    },
                    value => table.set(position, value, 0),
                }
            }

            Ok(())
        })
}

/// Runs `mode` sweeps at increasing remoteness until a sweep changes
/// nothing and the layer index clears the deepest child remoteness.
fn relax(
    ctx: &Context,
    table: &SolvingTable,
    children: &Children,
    mode: Mode,
    deepest_child: Remoteness,
) -> Result<()> {
    let mut level: Remoteness = 1;
    loop {
        let updated = sweep(ctx, table, children, mode, level)?;
        if updated && level > REMOTENESS_MAX {
            return Err(SolverError::RemotenessOverflow { tier: ctx.tier }.into());
        }

        if !updated && level > deepest_child + 1 {
            return Ok(());
        }

        level += 1;
    }
}

/// One parallel pass over all still-undecided positions, deciding those
/// whose children justify the value at exactly this remoteness layer.
fn sweep(
    ctx: &Context,
    table: &SolvingTable,
    children: &Children,
    mode: Mode,
    level: Remoteness,
) -> Result<bool> {
    let updated = AtomicBool::new(false);
    let size = table.size();
    let chunks = size.div_ceil(SCAN_CHUNK);
    (0..chunks)
        .into_par_iter()
        .try_for_each(|chunk| -> Result<()> {
            let start = chunk * SCAN_CHUNK;
            let end = size.min(start + SCAN_CHUNK);
            for position in start..end {
                if table.get(position).value != Value::Undecided {
                    continue;
                }

                let state = TierPosition {
                    tier: ctx.tier,
                    position,
                };

                if let Some((value, remoteness)) =
                    decide(ctx, children, state, mode, level)?
                {
                    table.set(position, value, remoteness);
                    updated.store(true, Ordering::Relaxed);
                }
            }

            Ok(())
        })?;

    Ok(updated.load(Ordering::Relaxed))
}

/// Evaluates one undecided position against the current layer.
fn decide(
    ctx: &Context,
    children: &Children,
    state: TierPosition,
    mode: Mode,
    level: Remoteness,
) -> Result<Option<(Value, Remoteness)>> {
    match mode {
        Mode::Decisive => {
            let mut all_win = true;
            let mut deepest: Remoteness = 0;
            for child in ctx.game.canonical_children(state) {
                let record = children.record(child)?;
                match record.value {
                    // A losing child at the previous layer is the nearest
                    // win this position will ever see.
                    Value::Lose if record.remoteness == level - 1 => {
                        return Ok(Some((Value::Win, level)))
                    },
                    Value::Lose => all_win = false,
                    Value::Win => deepest = deepest.max(record.remoteness),
                    _ => all_win = false,
                }
            }

            if all_win && deepest == level - 1 {
                Ok(Some((Value::Lose, level)))
            } else {
                Ok(None)
            }
        },
        Mode::Tie => {
            for child in ctx.game.canonical_children(state) {
                let record = children.record(child)?;
                if record.value == Value::Tie && record.remoteness == level - 1
                {
                    return Ok(Some((Value::Tie, level)));
                }
            }

            Ok(None)
        },
    }
}

/// Swaps the transient markings: slots seeded as draws (illegal or
/// non-canonical) return to undecided, and surviving undecided positions
/// become the tier's draws.
fn invert(table: &SolvingTable) {
    let size = table.size();
    let chunks = size.div_ceil(SCAN_CHUNK);
    (0..chunks).into_par_iter().for_each(|chunk| {
        let start = chunk * SCAN_CHUNK;
        let end = size.min(start + SCAN_CHUNK);
        for position in start..end {
            match table.get(position).value {
                Value::Draw => table.set(position, Value::Undecided, 0),
                Value::Undecided => table.set(position, Value::Draw, 0),
                _ => (),
            }
        }
    });
}

/* UTILITY */

impl Children<'_> {
    /// Reads the current record of `child`, wherever it lives.
    fn record(&self, child: TierPosition) -> Result<Record> {
        if child.tier == self.ctx.tier {
            return Ok(self.table.get(child.position));
        }

        let canonical = self.ctx.game.canonical_tier(child.tier);
        let position = if canonical == child.tier {
            child.position
        } else {
            self.ctx
                .game
                .position_in_symmetric_tier(child, canonical)
        };

        match self.loaded.get(&canonical) {
            Some(tier) => tier.record(position),
            None => Err(GameError::ApiViolation {
                hint: format!(
                    "Position {} generated a child in tier {}, which is not \
                    among its tier's declared children.",
                    child.position, child.tier,
                ),
            }
            .into()),
        }
    }
}
