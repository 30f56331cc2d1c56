//! # Solver Error Module
//!
//! This module defines possible errors that could happen during the
//! execution of a solving algorithm.

use std::error::Error;
use std::fmt;

use crate::game::Position;
use crate::game::Tier;

/* ERROR WRAPPER */

/// Wrapper for all solver-related errors that could happen during runtime.
/// This pertains specifically to the elements of the `crate::solver` module.
#[derive(Debug)]
pub enum SolverError {
    /// An error to indicate that a solver working structure could not be
    /// allocated. Distinct from a game producing impossible data, which is
    /// a `GameError`.
    OutOfMemory { what: &'static str },

    /// An error to indicate that propagation produced a remoteness beyond
    /// the representable maximum.
    RemotenessOverflow { tier: Tier },

    /// An error to indicate that a freshly solved table disagrees with the
    /// reference database it was compared against.
    Divergence { tier: Tier, position: Position },
}

impl Error for SolverError {}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { what } => {
                write!(f, "Failed to allocate {what} while solving.")
            },
            Self::RemotenessOverflow { tier } => {
                write!(
                    f,
                    "Solving tier {tier} produced a remoteness beyond the \
                    representable maximum.",
                )
            },
            Self::Divergence { tier, position } => {
                write!(
                    f,
                    "The solved table for tier {tier} disagrees with the \
                    reference database, first at position {position}.",
                )
            },
        }
    }
}

/* TESTER ERRORS */

/// First violation found by the game API conformance tester. Each variant
/// corresponds to one of the checks performed per sampled position.
#[derive(Debug, PartialEq, Eq)]
pub enum TesterError {
    /// Mapping a position into its own tier did not return the position.
    SymmetrySelfMap { tier: Tier, position: Position },

    /// Mapping a position into a symmetric tier and back did not return
    /// the original position.
    SymmetryInvolution { tier: Tier, position: Position },

    /// A generated child is out of range or illegal.
    IllegalChild { parent: Position, tier: Tier, child: Position },

    /// A position is missing from the parent list of one of its children.
    MissingParent { parent: Position, tier: Tier, child: Position },

    /// A position is missing from the child list of one of its parents.
    MissingChild { parent: Position, tier: Tier, child: Position },
}

impl Error for TesterError {}

impl fmt::Display for TesterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SymmetrySelfMap { tier, position } => {
                write!(
                    f,
                    "Position {position} of tier {tier} does not map to \
                    itself within its own tier.",
                )
            },
            Self::SymmetryInvolution { tier, position } => {
                write!(
                    f,
                    "The tier-symmetry map is not an involution on position \
                    {position} of tier {tier}.",
                )
            },
            Self::IllegalChild { parent, tier, child } => {
                write!(
                    f,
                    "Position {parent} generates the child {child} in tier \
                    {tier}, which is out of range or illegal.",
                )
            },
            Self::MissingParent { parent, tier, child } => {
                write!(
                    f,
                    "Position {parent} is absent from the parent list of its \
                    child {child} in tier {tier}.",
                )
            },
            Self::MissingChild { parent, tier, child } => {
                write!(
                    f,
                    "Child {child} in tier {tier} is absent from the child \
                    list of its parent {parent}.",
                )
            },
        }
    }
}
