//! # Solver Module
//!
//! This module provides behavior for the systematic traversal of tiered game
//! graphs via their implementation of different interfaces defining their
//! behavior, with the objective of computing their solutions one tier at a
//! time: each tier is solved bottom-up from the solved tables of its child
//! tiers, and its own table is persisted before the next tier begins.

use anyhow::Context as _;
use anyhow::Result;

use crate::database::Database;
use crate::database::TierStatus;
use crate::game::Tier;
use crate::game::TierGame;
use crate::game::TierType;
use crate::game::error::GameError;
use crate::solver::error::SolverError;

/* UTILITY MODULES */


pub mod util;
pub mod error;

/* MODULES */

pub mod tester;
pub mod worker;
pub mod algorithm {
    pub mod acyclic;
    pub mod loopy;
}

mod frontier;
mod reverse;

/* TYPES */

/// Indicates the number of choices that players have to make to reach a
/// terminal state in a game under perfect play. Zero for primitive
/// positions; meaningless for draws.
pub type Remoteness = u32;

/* CONSTANTS */

/// Largest representable remoteness. A game producing longer optimal lines
/// than this is out of contract, and solving it fails explicitly.
pub const REMOTENESS_MAX: Remoteness = 1023;

/// Largest number of distinct canonical children a single position may
/// have; bounded by the width of the per-position undecided-children
/// counters.
pub(crate) const CHILD_COUNT_MAX: u64 = 254;

/// Parallel chunk granularity for streaming child tiers out of the
/// database.
pub(crate) const LOAD_CHUNK: u64 = 4096;

/// Parallel chunk granularity for scanning and draw-marking the solving
/// tier.
pub(crate) const SCAN_CHUNK: u64 = 1024;

/// Parallel chunk granularity for frontier propagation.
pub(crate) const PUSH_CHUNK: usize = 16;

/* DEFINITIONS */

/// The collaborators of a single tier solve, passed explicitly into every
/// phase of the solving algorithms.
pub struct Context<'a> {
    pub game: &'a dyn TierGame,
    pub db: &'a dyn Database,
    pub tier: Tier,
}

/// What a call to [`solve_tier`] did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// The tier was solved and its table flushed.
    Solved,

    /// The tier was already solved; nothing was recomputed.
    Loaded,
}

/* SOLVER ENTRY */

/// Solves a single canonical `tier` of `game` into `db`, dispatching on the
/// tier's declared structure.
///
/// If the tier is already solved and `force` is not set, this is a no-op.
/// When `reference` is provided, the freshly solved table is cross-checked
/// against it position by position, and the first divergence fails the
/// solve.
///
/// # Errors
///
/// Any failure (allocation, database, game API contract violation) aborts
/// the tier without flushing partial results.
pub fn solve_tier(
    game: &dyn TierGame,
    db: &dyn Database,
    tier: Tier,
    force: bool,
    reference: Option<&dyn Database>,
) -> Result<Outcome> {
    if game.canonical_tier(tier) != tier {
        return Err(GameError::NonCanonicalTier { tier }.into());
    }

    if !force && db.status(tier)? == TierStatus::Solved {
        log::debug!("tier {} already solved, skipping", game.tier_name(tier));
        return Ok(Outcome::Loaded);
    }

    let ctx = Context { game, db, tier };
    match game.tier_type(tier) {
        TierType::Loopy => algorithm::loopy::solve(&ctx)
            .context("Retrograde frontier solver failed.")?,
        TierType::LoopFree | TierType::ImmediateTransition => {
            algorithm::acyclic::solve(&ctx)
                .context("Value-iteration solver failed.")?
        },
    }

    if let Some(reference) = reference {
        compare(&ctx, reference)?;
    }

    Ok(Outcome::Solved)
}

/// Solves every tier reachable from `game`'s initial tier, children before
/// parents.
///
/// This is the minimal sequential driver for whole-game solves; scheduling
/// across machines or prioritizing tiers is left to external dispatchers
/// built on [`solve_tier`].
pub fn solve_game(
    game: &dyn TierGame,
    db: &dyn Database,
    force: bool,
    reference: Option<&dyn Database>,
) -> Result<()> {
    let order = util::tier_order(game)?;
    log::info!("discovered {} canonical tiers", order.len());
    for &tier in order.iter().rev() {
        solve_tier(game, db, tier, force, reference).with_context(|| {
            format!("Failed to solve tier {}.", game.tier_name(tier))
        })?;
    }

    Ok(())
}

/* VERIFICATION */

/// Cross-checks the solved table of `ctx.tier` against a reference
/// database, reporting the first divergent position.
fn compare(ctx: &Context, reference: &dyn Database) -> Result<()> {
    let mut fresh = ctx.db.probe(ctx.tier)?;
    let mut known = reference
        .probe(ctx.tier)
        .context("Reference database cannot serve the compared tier.")?;

    for position in 0..ctx.game.tier_size(ctx.tier) {
        let ours = fresh.record(position)?;
        let theirs = known.record(position)?;
        if ours != theirs {
            log::error!(
                "tier {} diverges from reference at position {}: \
                solved ({}, {}), reference ({}, {})",
                ctx.game.tier_name(ctx.tier),
                position,
                ours.value,
                ours.remoteness,
                theirs.value,
                theirs.remoteness,
            );

            return Err(SolverError::Divergence {
                tier: ctx.tier,
                position,
            }
            .into());
        }
    }

    Ok(())
}
