//! # Zero-By Game Module
//!
//! Zero-By is a simple game where two players take turns removing one of
//! certain amounts of elements from a set of N elements. For example,
//! players could take turns removing either one or two coins from a stack
//! of ten, which would be an instance of Ten to Zero by One or Two (coins).
//!
//! The tiered view of the game is immediate: the number of remaining
//! elements indexes the tier, every move strictly decreases it, and the only
//! in-tier information left is whose turn it is. This makes every tier an
//! immediate-transition tier, solved by value iteration.

use anyhow::Result;

use crate::game::GameData;
use crate::game::Information;
use crate::game::Move;
use crate::game::Position;
use crate::game::Tier;
use crate::game::TierGame;
use crate::game::TierPosition;
use crate::game::TierType;
use crate::game::Value;
use crate::game::Variable;
use crate::game::Variant;
use crate::game::zero_by::variants::*;

/* SUBMODULES */

mod variants;

/* DEFINITIONS */

/// Both players play the same move set, so a tier's only in-tier state is
/// the player to move.
const PLAYERS: u64 = 2;

/* GAME DATA */

const NAME: &str = "zero-by";
const AUTHORS: &str = "Max Fierro <maxfierro@berkeley.edu>";
const ABOUT: &str = "Two players take turns removing a number of elements \
from a set of arbitrary size. The game variant determines how many elements \
are in the set to begin with, and the options players have in the amount of \
elements to remove during their turn. The player who is left with 0 elements \
in their turn loses. A player cannot remove more elements than currently \
available in the set.";

/* GAME IMPLEMENTATION */

pub struct Session {
    start: u64,
    by: Vec<u64>,
}

impl Session {
    pub fn new(variant: Option<Variant>) -> Result<Self> {
        if let Some(v) = variant {
            Self::variant(v)
        } else {
            Ok(Self::default())
        }
    }

    /* UTILITY */

    /// Removal amounts playable with `remaining` elements left, deduplicated
    /// in a stable order.
    fn amounts(&self, remaining: u64) -> Vec<u64> {
        let mut amounts = self
            .by
            .iter()
            .copied()
            .filter(|&amount| amount <= remaining)
            .collect::<Vec<u64>>();

        amounts.sort_unstable();
        amounts.dedup();
        amounts
    }
}

/* IMPLEMENTATIONS */

impl Default for Session {
    fn default() -> Self {
        parse_variant(VARIANT_DEFAULT.to_owned())
            .expect("Failed to parse default variant.")
    }
}

impl Information for Session {
    fn info() -> GameData {
        GameData {
            name: NAME,
            authors: AUTHORS,
            about: ABOUT,

            variant_protocol: VARIANT_PROTOCOL,
            variant_pattern: VARIANT_PATTERN,
            variant_default: VARIANT_DEFAULT,
        }
    }
}

impl Variable for Session {
    fn variant(variant: Variant) -> Result<Self> {
        parse_variant(variant)
    }
}

impl TierGame for Session {
    fn initial_tier(&self) -> Tier {
        self.start
    }

    fn initial_position(&self) -> TierPosition {
        TierPosition {
            tier: self.start,
            position: 0,
        }
    }

    fn tier_size(&self, _tier: Tier) -> u64 {
        PLAYERS
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        self.amounts(tier)
            .into_iter()
            .map(|amount| tier - amount)
            .rev()
            .collect()
    }

    fn generate_moves(&self, state: TierPosition) -> Vec<Move> {
        self.amounts(state.tier)
    }

    fn do_move(&self, state: TierPosition, mv: Move) -> TierPosition {
        TierPosition {
            tier: state.tier - mv,
            position: (state.position + 1) % PLAYERS,
        }
    }

    fn primitive(&self, state: TierPosition) -> Value {
        if state.tier == 0 {
            Value::Lose
        } else {
            Value::Undecided
        }
    }

    fn is_legal(&self, state: TierPosition) -> bool {
        state.tier <= self.start && state.position < PLAYERS
    }

    fn number_of_canonical_children(&self, state: TierPosition) -> Option<u64> {
        Some(self.amounts(state.tier).len() as u64)
    }

    fn canonical_parents(
        &self,
        child: TierPosition,
        parent_tier: Tier,
    ) -> Option<Vec<Position>> {
        let reachable = self
            .by
            .iter()
            .any(|&amount| parent_tier >= amount && parent_tier - amount == child.tier);

        if reachable && parent_tier <= self.start {
            Some(vec![(child.position + 1) % PLAYERS])
        } else {
            Some(Vec::new())
        }
    }

    fn tier_type(&self, _tier: Tier) -> TierType {
        TierType::ImmediateTransition
    }

    fn tier_name(&self, tier: Tier) -> String {
        format!("{tier}_remaining")
    }
}
