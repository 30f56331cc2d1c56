//! # Game API Tester Module
//!
//! Solving algorithms trust the game API completely: a wrong parent list or
//! an illegal child silently corrupts entire solution tables. This module
//! provides black-box conformance checks over a sample of positions in one
//! tier, verifying symmetry self-consistency, child legality, and the
//! reciprocity of the child and parent relations before any solving begins.

use anyhow::Result;
use rand::Rng;
use rand_mt::Mt64;

use crate::game::Position;
use crate::game::Tier;
use crate::game::TierGame;
use crate::game::TierPosition;
use crate::game::Value;
use crate::solver::error::TesterError;

/* CONSTANTS */

/// Most positions examined per tier. Tiers at most this large are checked
/// exhaustively instead of sampled.
const SAMPLE_MAX: u64 = 1000;

/* TESTER ENTRY */

/// Checks the game API's self-consistency on up to [`SAMPLE_MAX`] positions
/// of `tier`, drawn from a Mersenne-Twister stream seeded with `seed` so
/// failures reproduce exactly. `parent_tiers` drives the parent-side
/// reciprocity check and should contain every tier that reaches `tier`.
///
/// Returns the first violation found as a [`TesterError`].
pub fn test_tier(
    game: &dyn TierGame,
    tier: Tier,
    parent_tiers: &[Tier],
    seed: u64,
) -> Result<()> {
    let size = game.tier_size(tier);
    let mut rng = Mt64::new(seed);
    let samples = if size <= SAMPLE_MAX {
        (0..size).collect::<Vec<Position>>()
    } else {
        (0..SAMPLE_MAX)
            .map(|_| rng.gen_range(0..size))
            .collect()
    };

    for position in samples {
        let state = TierPosition { tier, position };
        if !game.is_legal(state) || game.primitive(state) != Value::Undecided
        {
            continue;
        }

        check_symmetry(game, state)?;
        check_children(game, state)?;
        check_parents_of_children(game, state)?;
        check_children_of_parents(game, state, parent_tiers)?;
    }

    Ok(())
}

/* CHECKS */

/// The tier-symmetry map must fix positions within their own tier, both for
/// the sampled position and for its image in the canonical tier, and going
/// to the canonical tier and back must return the original.
fn check_symmetry(
    game: &dyn TierGame,
    state: TierPosition,
) -> Result<(), TesterError> {
    if game.position_in_symmetric_tier(state, state.tier) != state.position {
        return Err(TesterError::SymmetrySelfMap {
            tier: state.tier,
            position: state.position,
        });
    }

    let canonical = game.canonical_tier(state.tier);
    if canonical == state.tier {
        return Ok(());
    }

    let image = TierPosition {
        tier: canonical,
        position: game.position_in_symmetric_tier(state, canonical),
    };

    if game.position_in_symmetric_tier(image, canonical) != image.position {
        return Err(TesterError::SymmetrySelfMap {
            tier: image.tier,
            position: image.position,
        });
    }

    if game.position_in_symmetric_tier(image, state.tier) != state.position {
        return Err(TesterError::SymmetryInvolution {
            tier: state.tier,
            position: state.position,
        });
    }

    Ok(())
}

/// Every generated child must fall within its tier's hash space and be
/// legal.
fn check_children(
    game: &dyn TierGame,
    state: TierPosition,
) -> Result<(), TesterError> {
    for child in game.canonical_children(state) {
        if child.position >= game.tier_size(child.tier)
            || !game.is_legal(child)
        {
            return Err(TesterError::IllegalChild {
                parent: state.position,
                tier: child.tier,
                child: child.position,
            });
        }
    }

    Ok(())
}

/// Every child generated from the canonical form of the position must list
/// that canonical form among its parents.
fn check_parents_of_children(
    game: &dyn TierGame,
    state: TierPosition,
) -> Result<(), TesterError> {
    let canonical = TierPosition {
        tier: state.tier,
        position: game.canonical_position(state),
    };

    for child in game.canonical_children(canonical) {
        match game.canonical_parents(child, state.tier) {
            None => return Ok(()),
            Some(parents) => {
                if !parents.contains(&canonical.position) {
                    return Err(TesterError::MissingParent {
                        parent: canonical.position,
                        tier: child.tier,
                        child: child.position,
                    });
                }
            },
        }
    }

    Ok(())
}

/// Every legal, non-primitive parent claimed in any parent tier must list
/// the canonical form of the position among its children.
fn check_children_of_parents(
    game: &dyn TierGame,
    state: TierPosition,
    parent_tiers: &[Tier],
) -> Result<(), TesterError> {
    let canonical = TierPosition {
        tier: state.tier,
        position: game.canonical_position(state),
    };

    for &parent_tier in parent_tiers {
        let parents = match game.canonical_parents(canonical, parent_tier) {
            None => return Ok(()),
            Some(parents) => parents,
        };

        for parent in parents {
            let claimant = TierPosition {
                tier: parent_tier,
                position: parent,
            };

            if !game.is_legal(claimant)
                || game.primitive(claimant) != Value::Undecided
            {
                continue;
            }

            if !game
                .canonical_children(claimant)
                .contains(&canonical)
            {
                return Err(TesterError::MissingChild {
                    parent,
                    tier: canonical.tier,
                    child: canonical.position,
                });
            }
        }
    }

    Ok(())
}
