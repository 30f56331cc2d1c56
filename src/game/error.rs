//! # Game Error Module
//!
//! This module defines possible errors that could happen as a result of
//! providing game implementations with bad input, or of game implementations
//! violating the contracts of the solving interfaces.

use std::error::Error;
use std::fmt;

use crate::game::Tier;
use crate::game::TierPosition;

/* ERROR WRAPPER */

/// Wrapper for all game-related errors that could happen during runtime.
/// This pertains specifically to the elements of the `crate::game` module.
#[derive(Debug)]
pub enum GameError {
    /// An error to indicate that a user-provided variant string does not
    /// conform to the game's variant protocol.
    VariantMalformed { game: &'static str, hint: String },

    /// An error to indicate that a game implementation answered a solver
    /// query in a way that violates the `TierGame` contract.
    ApiViolation { hint: String },

    /// An error to indicate that a game implementation produced a legal,
    /// non-primitive position with no children, which contradicts its own
    /// primitive classification.
    ChildlessPosition { state: TierPosition },

    /// An error to indicate that a tier submitted for solving is not the
    /// canonical representative of its symmetry class.
    NonCanonicalTier { tier: Tier },

    /// An error to indicate that a declarative mock game was built with an
    /// inconsistent description.
    MockViolation { hint: String },
}

impl Error for GameError {}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariantMalformed { game, hint } => {
                write!(
                    f,
                    "The provided variant is not valid for the game \
                    '{game}': {hint}",
                )
            },
            Self::ApiViolation { hint } => {
                write!(
                    f,
                    "A game implementation violated the solver interface \
                    contract: {hint}",
                )
            },
            Self::ChildlessPosition { state } => {
                write!(
                    f,
                    "Position {} in tier {} is legal and non-primitive but \
                    has no children.",
                    state.position, state.tier,
                )
            },
            Self::NonCanonicalTier { tier } => {
                write!(
                    f,
                    "Tier {tier} is not the canonical member of its symmetry \
                    class; only canonical tiers can be solved.",
                )
            },
            Self::MockViolation { hint } => {
                write!(
                    f,
                    "Attempted to construct an inconsistent mock game: {hint}",
                )
            },
        }
    }
}
