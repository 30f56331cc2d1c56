//! # Loopy Tier Solver Module
//!
//! This module implements the retrograde solver for tiers that may contain
//! in-tier cycles. Solved positions of child tiers (and primitives of the
//! solving tier) seed per-worker frontiers bucketed by remoteness; the
//! frontiers are then pushed up through the parent relation level by level,
//! draining a dense array of per-position undecided-children counters.
//! Positions whose counter survives the push can avoid losing forever
//! without being able to win, and are marked as draws.

use anyhow::Result;
use rayon::prelude::*;

use std::sync::Mutex;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::database::SolvingTable;
use crate::database::error::DatabaseError;
use crate::game::Position;
use crate::game::Tier;
use crate::game::TierPosition;
use crate::game::Value;
use crate::game::error::GameError;
use crate::solver::CHILD_COUNT_MAX;
use crate::solver::Context;
use crate::solver::LOAD_CHUNK;
use crate::solver::PUSH_CHUNK;
use crate::solver::REMOTENESS_MAX;
use crate::solver::Remoteness;
use crate::solver::SCAN_CHUNK;
use crate::solver::error::SolverError;
use crate::solver::frontier;
use crate::solver::frontier::Frontier;
use crate::solver::reverse::ReverseGraph;

/* DEFINITIONS */

/// The three frontier lanes a decided position can travel through.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Win,
    Lose,
    Tie,
}

/// One worker thread's frontier triple.
struct FrontierSet {
    win: Frontier,
    lose: Frontier,
    tie: Frontier,
}

/// Everything the parallel phases of one tier solve share. Built once after
/// allocation succeeds and passed by reference into every helper.
struct Pass<'a> {
    ctx: &'a Context<'a>,
    child_tiers: &'a [Tier],
    self_index: usize,
    frontiers: &'a [Mutex<FrontierSet>],
    reverse: Option<&'a ReverseGraph>,
    table: &'a SolvingTable,
    undecided: &'a [AtomicU8],
}

/* SOLVER */

/// Solves `ctx.tier` by parallel retrograde analysis and flushes its table.
pub fn solve(ctx: &Context) -> Result<()> {
    let clock = Instant::now();
    let size = ctx.game.tier_size(ctx.tier);
    log::info!(
        "solving tier {} ({} positions, loopy)",
        ctx.game.tier_name(ctx.tier),
        size,
    );

    let mut child_tiers = ctx.game.child_tiers(ctx.tier);
    let analytic = ctx
        .game
        .canonical_parents(
            TierPosition {
                tier: ctx.tier,
                position: 0,
            },
            ctx.tier,
        )
        .is_some();

    let reverse = if analytic {
        None
    } else {
        Some(ReverseGraph::new())
    };

    // The solving tier acts as its own last child: primitives and positions
    // decided during propagation re-enter the frontier under this index.
    child_tiers.push(ctx.tier);
    let self_index = child_tiers.len() - 1;

    let workers = rayon::current_num_threads();
    let frontiers = (0..=workers)
        .map(|_| Ok(Mutex::new(FrontierSet::new(child_tiers.len())?)))
        .collect::<Result<Vec<Mutex<FrontierSet>>, SolverError>>()?;

    load_children(ctx, &child_tiers, &frontiers)?;

    let table = ctx.db.new_table(ctx.tier, size)?;
    let undecided = new_counters(size)?;
    let pass = Pass {
        ctx,
        child_tiers: &child_tiers,
        self_index,
        frontiers: &frontiers,
        reverse: reverse.as_ref(),
        table: &table,
        undecided: &undecided,
    };

    scan_tier(&pass)?;
    for set in pass.frontiers {
        let mut set = set.lock().expect("Frontier lock poisoned.");
        set.win.accumulate_dividers();
        set.lose.accumulate_dividers();
        set.tie.accumulate_dividers();
    }

    push_frontiers(&pass)?;
    mark_draws(&pass);
    ctx.db.flush(&table)?;
    log::info!(
        "solved tier {} in {:.2?}",
        ctx.game.tier_name(ctx.tier),
        clock.elapsed(),
    );

    Ok(())
}

/* SOLVING PHASES */

/// Streams every solved child tier into the worker frontiers. Child tiers
/// are visited sequentially so that each frontier bucket receives its
/// records in ascending child-index order; the scan within one child tier
/// is parallel.
fn load_children(
    ctx: &Context,
    child_tiers: &[Tier],
    frontiers: &[Mutex<FrontierSet>],
) -> Result<()> {
    let children = &child_tiers[..child_tiers.len() - 1];
    for (index, &child) in children.iter().enumerate() {
        let canonical = ctx.game.canonical_tier(child);
        let size = ctx.game.tier_size(canonical);
        let chunks = size.div_ceil(LOAD_CHUNK);
        (0..chunks)
            .into_par_iter()
            .try_for_each(|chunk| -> Result<()> {
                let mut probe = ctx.db.probe(canonical)?;
                let start = chunk * LOAD_CHUNK;
                let end = size.min(start + LOAD_CHUNK);
                for position in start..end {
                    let record = probe.record(position)?;
                    if record.remoteness > REMOTENESS_MAX {
                        return Err(DatabaseError::Corrupted {
                            hint: format!(
                                "Record remoteness {} exceeds the maximum.",
                                record.remoteness,
                            ),
                        }
                        .into());
                    }

                    match record.value {
                        Value::Undecided | Value::Draw => continue,

                        // Ties of a symmetric child tier are already
                        // captured through its canonical tier.
                        Value::Tie if canonical != child => continue,

                        value => {
                            let position = if canonical == child {
                                position
                            } else {
                                ctx.game.position_in_symmetric_tier(
                                    TierPosition {
                                        tier: canonical,
                                        position,
                                    },
                                    child,
                                )
                            };

                            emit(
                                frontiers,
                                Kind::of(value),
                                position,
                                record.remoteness,
                                index,
                            )?;
                        },
                    }
                }

                Ok(())
            })?;

        log::debug!(
            "loaded child tier {} into frontier",
            ctx.game.tier_name(child),
        );
    }

    Ok(())
}

/// Visits every position of the solving tier in parallel: primitives are
/// written and seeded into the frontier at remoteness zero, and undecided
/// positions get their canonical-children count (registering the reverse
/// parent relation along the way when no analytic parents exist).
fn scan_tier(pass: &Pass) -> Result<()> {
    let game = pass.ctx.game;
    let size = pass.table.size();
    let chunks = size.div_ceil(SCAN_CHUNK);
    (0..chunks)
        .into_par_iter()
        .try_for_each(|chunk| -> Result<()> {
            let start = chunk * SCAN_CHUNK;
            let end = size.min(start + SCAN_CHUNK);
            for position in start..end {
                let state = TierPosition {
                    tier: pass.ctx.tier,
                    position,
                };

                if !game.is_legal(state)
                    || game.canonical_position(state) != position
                {
                    continue;
                }

                let value = game.primitive(state);
                if value != Value::Undecided {
                    if value == Value::Draw {
                        return Err(GameError::ApiViolation {
                            hint: format!(
                                "Primitive classification of position \
                                {position} is a draw.",
                            ),
                        }
                        .into());
                    }

                    pass.table.set(position, value, 0);
                    emit(
                        pass.frontiers,
                        Kind::of(value),
                        position,
                        0,
                        pass.self_index,
                    )?;

                    continue;
                }

                let children =
                    match (pass.reverse, game.number_of_canonical_children(state)) {
                        (None, Some(count)) => count,
                        (reverse, _) => {
                            let children = game.canonical_children(state);
                            if let Some(graph) = reverse {
                                for &child in &children {
                                    graph.add(child, position);
                                }
                            }

                            children.len() as u64
                        },
                    };

                if children == 0 {
                    return Err(GameError::ChildlessPosition { state }.into());
                }

                if children > CHILD_COUNT_MAX {
                    return Err(GameError::ApiViolation {
                        hint: format!(
                            "Position {position} has {children} canonical \
                            children; at most {CHILD_COUNT_MAX} are \
                            supported.",
                        ),
                    }
                    .into());
                }

                pass.undecided[position as usize]
                    .store(children as u8, Ordering::Relaxed);
            }

            Ok(())
        })
}

/// Propagates frontier levels in ascending remoteness order: losses before
/// wins within each level, and ties only after every win/lose level has
/// drained completely.
fn push_frontiers(pass: &Pass) -> Result<()> {
    for remoteness in 0..=REMOTENESS_MAX {
        push_level(pass, Kind::Lose, remoteness)?;
        push_level(pass, Kind::Win, remoteness)?;
    }

    for remoteness in 0..=REMOTENESS_MAX {
        push_level(pass, Kind::Tie, remoteness)?;
    }

    Ok(())
}

/// Drains one remoteness level of one frontier lane across all workers and
/// settles the parents of every record in it. Taking the level out of the
/// frontier releases its storage once processing ends.
fn push_level(pass: &Pass, kind: Kind, remoteness: Remoteness) -> Result<()> {
    let levels = pass
        .frontiers
        .iter()
        .map(|set| {
            set.lock()
                .expect("Frontier lock poisoned.")
                .lane(kind)
                .take_level(remoteness)
        })
        .collect::<Vec<(Vec<Position>, Vec<u64>)>>();

    for (positions, dividers) in &levels {
        if positions.is_empty() {
            continue;
        }

        positions
            .par_iter()
            .enumerate()
            .with_min_len(PUSH_CHUNK)
            .try_for_each(|(offset, &position)| -> Result<()> {
                let child = frontier::child_index(dividers, offset);
                let state = TierPosition {
                    tier: pass.child_tiers[child],
                    position,
                };

                for parent in parents_of(pass, state)? {
                    settle(pass, kind, remoteness, parent)?;
                }

                Ok(())
            })?;
    }

    Ok(())
}

/// Applies one decided child at `remoteness` to `parent`'s counter, writing
/// and re-seeding the parent if this child decides it.
fn settle(
    pass: &Pass,
    kind: Kind,
    remoteness: Remoteness,
    parent: Position,
) -> Result<()> {
    let counter = &pass.undecided[parent as usize];
    match kind {
        // A losing or tying child decides any still-open parent outright.
        // Zeroing on the tie path is sound: a parent first reached through
        // a tie child can never later be proven a loss, since that would
        // require all of its children to win while the tie child never
        // enters the win lane.
        Kind::Lose | Kind::Tie => {
            if counter.swap(0, Ordering::Relaxed) != 0 {
                let value = match kind {
                    Kind::Lose => Value::Win,
                    _ => Value::Tie,
                };

                decide(pass, value, parent, remoteness + 1)?;
            }
        },

        // A winning child only narrows the parent. The compare-exchange
        // loop never decrements a zero counter and lets exactly one thread
        // observe the transition to zero, making it the unique writer.
        Kind::Win => {
            let mut seen = counter.load(Ordering::Relaxed);
            while seen != 0 {
                match counter.compare_exchange_weak(
                    seen,
                    seen - 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        if seen == 1 {
                            decide(pass, Value::Lose, parent, remoteness + 1)?;
                        }

                        break;
                    },
                    Err(now) => seen = now,
                }
            }
        },
    }

    Ok(())
}

/// Writes a freshly decided parent and re-seeds it into the frontier at
/// the solving tier's own child index.
fn decide(
    pass: &Pass,
    value: Value,
    position: Position,
    remoteness: Remoteness,
) -> Result<()> {
    if remoteness > REMOTENESS_MAX {
        return Err(SolverError::RemotenessOverflow {
            tier: pass.ctx.tier,
        }
        .into());
    }

    pass.table.set(position, value, remoteness);
    emit(
        pass.frontiers,
        Kind::of(value),
        position,
        remoteness,
        pass.self_index,
    )
}

/// Labels every position whose counter survived propagation as a draw: it
/// can always steer play toward another undecided position, and no line
/// forces it into a loss.
fn mark_draws(pass: &Pass) {
    let size = pass.table.size();
    let chunks = size.div_ceil(SCAN_CHUNK);
    (0..chunks).into_par_iter().for_each(|chunk| {
        let start = chunk * SCAN_CHUNK;
        let end = size.min(start + SCAN_CHUNK);
        for position in start..end {
            if pass.undecided[position as usize].load(Ordering::Relaxed) > 0 {
                pass.table.set(position, Value::Draw, 0);
            }
        }
    });
}

/* UTILITY */

impl Kind {
    fn of(value: Value) -> Kind {
        match value {
            Value::Win => Kind::Win,
            Value::Lose => Kind::Lose,
            Value::Tie => Kind::Tie,
            _ => unreachable!("Only decisive values enter frontiers."),
        }
    }
}

impl FrontierSet {
    fn new(dividers: usize) -> Result<Self, SolverError> {
        Ok(Self {
            win: Frontier::new(dividers)?,
            lose: Frontier::new(dividers)?,
            tie: Frontier::new(dividers)?,
        })
    }

    fn lane(&mut self, kind: Kind) -> &mut Frontier {
        match kind {
            Kind::Win => &mut self.win,
            Kind::Lose => &mut self.lose,
            Kind::Tie => &mut self.tie,
        }
    }
}

/// Appends a record to the current worker's frontier. Calls from outside
/// the thread pool spill into a dedicated extra slot.
fn emit(
    frontiers: &[Mutex<FrontierSet>],
    kind: Kind,
    position: Position,
    remoteness: Remoteness,
    child: usize,
) -> Result<()> {
    let slot = rayon::current_thread_index().unwrap_or(frontiers.len() - 1);
    let mut set = frontiers[slot]
        .lock()
        .expect("Frontier lock poisoned.");

    set.lane(kind)
        .add(position, remoteness, child)?;

    Ok(())
}

/// Fetches the parents of `child` within the solving tier, either from the
/// game or from the reverse graph recorded during the scan.
fn parents_of(pass: &Pass, child: TierPosition) -> Result<Vec<Position>> {
    if let Some(graph) = pass.reverse {
        return Ok(graph.pop(child));
    }

    match pass.ctx.game.canonical_parents(child, pass.ctx.tier) {
        Some(parents) => Ok(parents),
        None => Err(GameError::ApiViolation {
            hint: "Parent generation support must be uniform across queries."
                .into(),
        }
        .into()),
    }
}

fn new_counters(size: u64) -> Result<Vec<AtomicU8>> {
    let mut counters = Vec::new();
    counters
        .try_reserve_exact(size as usize)
        .map_err(|_| SolverError::OutOfMemory {
            what: "undecided-children counters",
        })?;

    counters.resize_with(size as usize, || AtomicU8::new(0));
    Ok(counters)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::database::Database as _;
    use crate::database::volatile;
    use crate::game::TierGame;
    use crate::game::TierType;
    use crate::game::mock::SessionBuilder;
    use crate::solver::Outcome;
    use crate::solver::solve_tier;

    fn solved(
        db: &volatile::Database,
        tier: Tier,
        position: Position,
    ) -> (Value, Remoteness) {
        let mut probe = db.probe(tier).unwrap();
        let record = probe.record(position).unwrap();
        (record.value, record.remoteness)
    }

    #[test]
    fn terminal_only_tier_solves_to_its_primitives() -> Result<()> {
        let game = SessionBuilder::new("terminal-only")
            .tier(0, 3)
            .primitive((0, 0), Value::Lose)
            .primitive((0, 1), Value::Win)
            .primitive((0, 2), Value::Tie)
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        assert_eq!(solve_tier(&game, &db, 0, false, None)?, Outcome::Solved);
        assert_eq!(solved(&db, 0, 0), (Value::Lose, 0));
        assert_eq!(solved(&db, 0, 1), (Value::Win, 0));
        assert_eq!(solved(&db, 0, 2), (Value::Tie, 0));
        Ok(())
    }

    #[test]
    fn solved_win_in_child_tier_condemns_sole_parent() -> Result<()> {
        let game = SessionBuilder::new("two-tier")
            .tier(1, 1)
            .tier(0, 1)
            .primitive((1, 0), Value::Win)
            .edge((0, 0), (1, 0))
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        solve_tier(&game, &db, 1, false, None)?;
        solve_tier(&game, &db, 0, false, None)?;
        assert_eq!(solved(&db, 0, 0), (Value::Lose, 1));
        Ok(())
    }

    #[test]
    fn unbreakable_cycle_is_a_draw() -> Result<()> {
        // Positions 0 and 1 cycle; both can also hand the opponent a win,
        // which no optimal player ever takes.
        let game = SessionBuilder::new("draw-cycle")
            .tier(0, 3)
            .edge((0, 0), (0, 1))
            .edge((0, 1), (0, 0))
            .edge((0, 0), (0, 2))
            .edge((0, 1), (0, 2))
            .primitive((0, 2), Value::Win)
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        solve_tier(&game, &db, 0, false, None)?;
        assert_eq!(solved(&db, 0, 0).0, Value::Draw);
        assert_eq!(solved(&db, 0, 1).0, Value::Draw);
        assert_eq!(solved(&db, 0, 2), (Value::Win, 0));
        Ok(())
    }

    #[test]
    fn escape_to_primitive_loss_breaks_cycle() -> Result<()> {
        // Position 0 can move to a primitive loss, winning in one; its
        // cycle partner 1 then has only winning children and loses in two.
        let game = SessionBuilder::new("lose-escape")
            .tier(0, 3)
            .edge((0, 0), (0, 1))
            .edge((0, 1), (0, 0))
            .edge((0, 0), (0, 2))
            .primitive((0, 2), Value::Lose)
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        solve_tier(&game, &db, 0, false, None)?;
        assert_eq!(solved(&db, 0, 0), (Value::Win, 1));
        assert_eq!(solved(&db, 0, 1), (Value::Lose, 2));
        assert_eq!(solved(&db, 0, 2), (Value::Lose, 0));
        Ok(())
    }

    #[test]
    fn ties_propagate_after_wins_and_losses() -> Result<()> {
        let game = SessionBuilder::new("tie-cycle")
            .tier(0, 3)
            .edge((0, 0), (0, 1))
            .edge((0, 1), (0, 0))
            .edge((0, 0), (0, 2))
            .primitive((0, 2), Value::Tie)
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        solve_tier(&game, &db, 0, false, None)?;
        assert_eq!(solved(&db, 0, 0), (Value::Tie, 1));
        assert_eq!(solved(&db, 0, 1), (Value::Tie, 2));
        Ok(())
    }

    #[test]
    fn illegal_and_noncanonical_positions_stay_undecided() -> Result<()> {
        let game = SessionBuilder::new("skips")
            .tier(0, 4)
            .primitive((0, 0), Value::Win)
            .fold((0, 1), 0)
            .illegal((0, 2))
            .primitive((0, 3), Value::Lose)
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        solve_tier(&game, &db, 0, false, None)?;
        assert_eq!(solved(&db, 0, 0), (Value::Win, 0));
        assert_eq!(solved(&db, 0, 1).0, Value::Undecided);
        assert_eq!(solved(&db, 0, 2).0, Value::Undecided);
        assert_eq!(solved(&db, 0, 3), (Value::Lose, 0));
        Ok(())
    }

    #[test]
    fn reverse_graph_agrees_with_analytic_parents() -> Result<()> {
        let build = |analytic: bool| {
            SessionBuilder::new("parent-parity")
                .tier(1, 3)
                .tier(0, 4)
                .primitive((1, 0), Value::Win)
                .primitive((1, 1), Value::Lose)
                .primitive((1, 2), Value::Tie)
                .edge((0, 0), (1, 0))
                .edge((0, 1), (1, 0))
                .edge((0, 1), (1, 1))
                .edge((0, 2), (1, 2))
                .edge((0, 2), (0, 3))
                .edge((0, 3), (0, 2))
                .parents(analytic)
                .start((0, 0))
                .build()
        };

        let with = build(true)?;
        let without = build(false)?;
        let a = volatile::Database::new();
        let b = volatile::Database::new();
        for tier in [1, 0] {
            solve_tier(&with, &a, tier, false, None)?;
            solve_tier(&without, &b, tier, false, None)?;
        }

        for (tier, size) in [(0, 4), (1, 3)] {
            for position in 0..size {
                assert_eq!(
                    solved(&a, tier, position),
                    solved(&b, tier, position),
                );
            }
        }

        // Spot-check the interesting facts themselves.
        assert_eq!(solved(&a, 0, 0), (Value::Lose, 1));
        assert_eq!(solved(&a, 0, 1), (Value::Win, 1));
        assert_eq!(solved(&a, 0, 2), (Value::Tie, 1));
        assert_eq!(solved(&a, 0, 3), (Value::Tie, 2));
        Ok(())
    }

    #[test]
    fn symmetric_child_tiers_translate_wins_and_losses() -> Result<()> {
        // Tier 2 is canonical and solved; tier 3 is its mirror under the
        // permutation (0 1). Tier 0 only ever references the mirror.
        let game = SessionBuilder::new("mirrored-child")
            .tier(2, 2)
            .tier(0, 2)
            .symmetric(3, 2, vec![1, 0])
            .primitive((2, 0), Value::Lose)
            .primitive((2, 1), Value::Win)
            .edge((0, 0), (3, 0))
            .edge((0, 1), (3, 1))
            .start((0, 0))
            .build()?;

        let db = volatile::Database::new();
        solve_tier(&game, &db, 2, false, None)?;
        solve_tier(&game, &db, 0, false, None)?;

        // Mirror position 0 is canonical position 1 (a win), so parent 0
        // loses; mirror position 1 is canonical position 0 (a loss), so
        // parent 1 wins.
        assert_eq!(solved(&db, 0, 0), (Value::Lose, 1));
        assert_eq!(solved(&db, 0, 1), (Value::Win, 1));
        Ok(())
    }

    #[test]
    fn tiers_declared_loopy_match_mock_type() {
        let game = SessionBuilder::new("typed")
            .tier(0, 1)
            .primitive((0, 0), Value::Win)
            .start((0, 0))
            .build()
            .unwrap();

        assert_eq!(game.tier_type(0), TierType::Loopy);
    }
}
