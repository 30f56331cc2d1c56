#![forbid(unsafe_code)]
//! # Game Module
//!
//! Contains definitions and interfaces that support sequential games viewed
//! as layered ("tiered") implicit graphs, where each tier is a maximal set of
//! positions closed under in-tier transitions, and the tiers themselves form
//! a directed acyclic graph. Special attention is paid to supporting families
//! of closely related games (variants).

use anyhow::Result;
use clap::ValueEnum;

/* UTILITY MODULES */

pub mod util;
pub mod error;

/* GAME MODULES */

#[cfg(test)]
pub mod mock;

pub mod zero_by;
pub mod mnk;

/* TYPES */

/// Opaque 64-bit identifier of a layer in a game graph.
pub type Tier = u64;

/// Non-negative integer hash of a game state, meaningful only within its
/// tier. Always within `[0, size(tier))`.
pub type Position = u64;

/// Opaque encoding of a single choice available at some position. Only ever
/// produced by [`TierGame::generate_moves`] and consumed by
/// [`TierGame::do_move`] on the same position.
pub type Move = u64;

/// String encoding some specific game's variant.
pub type Variant = String;

/* DEFINITIONS */

/// The global identity of a game state: a position within a tier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TierPosition {
    pub tier: Tier,
    pub position: Position,
}

/// The game-theoretic value of a position for the player whose turn it is.
///
/// `Undecided` is transient: it marks positions that have not been solved
/// yet, and is also what [`TierGame::primitive`] returns for non-terminal
/// positions. `Draw` denotes positions from which the player to move cannot
/// force a win but can avoid losing forever.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Value {
    Undecided = 0,
    Win = 1,
    Lose = 2,
    Tie = 3,
    Draw = 4,
}

/// Structural classification of a single tier, as declared by the game.
///
/// `Loopy` tiers may contain in-tier cycles and require retrograde analysis
/// over an explicit frontier. `LoopFree` tiers have acyclic in-tier edges,
/// and `ImmediateTransition` tiers (a subset) have no in-tier edges at all;
/// both admit a simpler fixed-point solver.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TierType {
    Loopy,
    LoopFree,
    ImmediateTransition,
}

/// Specifies the game offerings available through all interfaces.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum GameModule {
    /// Abstract game played over sets of items.
    ZeroBy,

    /// Generalized version of Tic-Tac-Toe.
    Mnk,
}

/// Contains useful data about a game.
///
/// The information here is intended to provide users of the program
/// information they can use to understand the output of solving algorithms,
/// in addition to specifying formats/protocols for communicating with game
/// implementations, and providing descriptive error outputs.
pub struct GameData {
    /// Known name for the game. This should return a string that can be used
    /// in the command-line as an argument to the CLI endpoints which require
    /// a game name (e.g. `tiers solve <TARGET>`).
    pub name: &'static str,

    /// The names of people who implemented the game listed out, optionally
    /// including their contact.
    pub authors: &'static str,

    /// General introduction to the game's rules, setup, etc., including any
    /// facts that are noteworthy about it.
    pub about: &'static str,

    /// Explanation of how to use strings to communicate which variant a user
    /// wishes to provide to the game's implementation.
    pub variant_protocol: &'static str,

    /// Regular expression pattern that all variant strings must match.
    pub variant_pattern: &'static str,

    /// Default variant string to be used when none is specified.
    pub variant_default: &'static str,
}

/* INTERFACES */

pub trait Information {
    /// Returns useful information about the game family. See [`GameData`].
    fn info() -> GameData;
}

pub trait Variable {
    /// Initializes a version of the underlying game as the specified
    /// `variant`.
    ///
    /// A variant is a member of a family of games whose structure is very
    /// similar. It is convenient to be able to express this because it saves
    /// a lot of needless re-writing of game logic, while allowing for a lot
    /// of generality in game implementations.
    ///
    /// # Errors
    ///
    /// Fails if `variant` does not conform to the game's protocol of
    /// encoding variants as strings.
    fn variant(variant: Variant) -> Result<Self>
    where
        Self: Sized;
}

/// The interface consumed by the tier solver.
///
/// The required methods define the game completely; each provided method is
/// an optional acceleration which the solver detects and exploits. Games
/// should override the provided methods whenever they can do better than the
/// generic fallbacks, and must do so consistently: an override must answer
/// every query, not just convenient ones.
pub trait TierGame: Send + Sync {
    /// Returns the tier containing the game's starting position.
    fn initial_tier(&self) -> Tier;

    /// Returns the game's starting position.
    fn initial_position(&self) -> TierPosition;

    /// Returns the number of position hashes in `tier`. Every position in
    /// the tier (legal or not) is below this bound.
    fn tier_size(&self, tier: Tier) -> u64;

    /// Returns the tiers reachable in one move from positions in `tier`,
    /// excluding `tier` itself, in a stable order.
    fn child_tiers(&self, tier: Tier) -> Vec<Tier>;

    /// Returns the moves available at `state`. Empty iff `state` is
    /// terminal.
    fn generate_moves(&self, state: TierPosition) -> Vec<Move>;

    /// Returns the state reached by making `mv` at `state`. The result of
    /// passing a move not generated at `state` is unspecified.
    fn do_move(&self, state: TierPosition, mv: Move) -> TierPosition;

    /// Returns the intrinsic value of `state`, or [`Value::Undecided`] if
    /// its value must be derived from its children. Never [`Value::Draw`].
    fn primitive(&self, state: TierPosition) -> Value;

    /// Returns true iff `state` is reachable in its game variant. Positions
    /// for which this is false are skipped by the solver entirely.
    fn is_legal(&self, state: TierPosition) -> bool;

    /// Returns the canonical representative of `state`'s in-tier symmetry
    /// class. The default (identity) disables position-symmetry folding.
    ///
    /// By convention the representative is the class member with the
    /// smallest hash, so the canonical image of a canonical position is
    /// itself.
    fn canonical_position(&self, state: TierPosition) -> Position {
        state.position
    }

    /// Returns the distinct canonical children of `state`.
    ///
    /// The default enumerates moves, applies them, and canonicalizes and
    /// deduplicates the results. Games able to generate children directly
    /// should override this.
    fn canonical_children(&self, state: TierPosition) -> Vec<TierPosition> {
        let mut children = self
            .generate_moves(state)
            .into_iter()
            .map(|mv| self.do_move(state, mv))
            .map(|child| TierPosition {
                tier: child.tier,
                position: self.canonical_position(child),
            })
            .collect::<Vec<TierPosition>>();

        children.sort_unstable_by_key(|c| (c.tier, c.position));
        children.dedup();
        children
    }

    /// Returns the number of distinct canonical children of `state`, or
    /// `None` if the game cannot count them faster than
    /// [`TierGame::canonical_children`] can enumerate them.
    fn number_of_canonical_children(&self, state: TierPosition) -> Option<u64> {
        let _ = state;
        None
    }

    /// Returns the canonical positions in `parent_tier` having `child`
    /// among their canonical children, or `None` if the game cannot compute
    /// parents analytically (in which case the solver builds a reverse graph
    /// by forward enumeration).
    ///
    /// Support must be uniform: an implementation either answers every
    /// query with `Some` (possibly empty), or always returns `None`.
    fn canonical_parents(
        &self,
        child: TierPosition,
        parent_tier: Tier,
    ) -> Option<Vec<Position>> {
        let _ = (child, parent_tier);
        None
    }

    /// Maps `state` to its image in `symmetric`, a tier symmetric to
    /// `state.tier`. Applying the map there and back is the identity. The
    /// default (identity on positions) is only correct when
    /// [`TierGame::canonical_tier`] is also left as the identity.
    fn position_in_symmetric_tier(
        &self,
        state: TierPosition,
        symmetric: Tier,
    ) -> Position {
        let _ = symmetric;
        state.position
    }

    /// Returns the canonical representative of `tier`'s symmetry class.
    /// The default (identity) disables tier-symmetry folding.
    fn canonical_tier(&self, tier: Tier) -> Tier {
        tier
    }

    /// Classifies `tier` structurally. The conservative default treats
    /// every tier as potentially cyclic.
    fn tier_type(&self, tier: Tier) -> TierType {
        let _ = tier;
        TierType::Loopy
    }

    /// Returns a human-readable name for `tier`, used to label database
    /// objects. The default names tiers numerically.
    fn tier_name(&self, tier: Tier) -> String {
        tier.to_string()
    }
}
