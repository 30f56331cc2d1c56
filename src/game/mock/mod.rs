//! # Mock Tiered Test Game Module
//!
//! This module provides a way to represent tiered games by declaring the
//! tier graph explicitly and assigning special conditions to positions.
//! This makes creating example games a matter of simply declaring them,
//! which the solver and tester test suites lean on heavily. Builders can
//! also sabotage specific API answers to reproduce the failure modes the
//! conformance tester is meant to catch.

use anyhow::Result;

use std::collections::HashMap;
use std::collections::HashSet;

use crate::game::Move;
use crate::game::Position;
use crate::game::Tier;
use crate::game::TierGame;
use crate::game::TierPosition;
use crate::game::TierType;
use crate::game::Value;
use crate::game::error::GameError;

/* DEFINITIONS */

/// Builder pattern for declaring a mock tiered game position by position.
/// Declared tiers are canonical; symmetric tiers exist only as permuted
/// views of a canonical one.
pub struct SessionBuilder {
    name: &'static str,
    tiers: HashMap<Tier, TierDecl>,
    symmetric: HashMap<Tier, Symmetry>,
    start: Option<TierPosition>,
    analytic: bool,
    broken_self_maps: HashSet<Tier>,
    forgotten: Vec<(TierPosition, Position)>,
    adopted: Vec<(TierPosition, Tier, Position)>,
}

/// Represents an initialized session of a declared mock game.
pub struct Session {
    name: &'static str,
    tiers: HashMap<Tier, TierDecl>,
    symmetric: HashMap<Tier, Symmetry>,
    start: TierPosition,
    parents: Option<HashMap<(TierPosition, Tier), Vec<Position>>>,
    broken_self_maps: HashSet<Tier>,
}

struct TierDecl {
    size: u64,
    kind: TierType,
    edges: HashMap<Position, Vec<TierPosition>>,
    primitives: HashMap<Position, Value>,
    illegal: HashSet<Position>,
    folds: HashMap<Position, Position>,
}

struct Symmetry {
    canonical: Tier,
    to_canonical: Vec<Position>,
    from_canonical: Vec<Position>,
}

/* BUILDER IMPLEMENTATION */

impl SessionBuilder {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tiers: HashMap::new(),
            symmetric: HashMap::new(),
            start: None,
            analytic: false,
            broken_self_maps: HashSet::new(),
            forgotten: Vec::new(),
            adopted: Vec::new(),
        }
    }

    /// Declares a loopy tier with `size` position slots.
    pub fn tier(self, tier: Tier, size: u64) -> Self {
        self.tier_typed(tier, size, TierType::Loopy)
    }

    /// Declares a tier with an explicit structural classification.
    pub fn tier_typed(mut self, tier: Tier, size: u64, kind: TierType) -> Self {
        self.tiers.insert(
            tier,
            TierDecl {
                size,
                kind,
                edges: HashMap::new(),
                primitives: HashMap::new(),
                illegal: HashSet::new(),
                folds: HashMap::new(),
            },
        );

        self
    }

    /// Declares a move from `from` to `to`.
    pub fn edge(mut self, from: (Tier, Position), to: (Tier, Position)) -> Self {
        self.tiers
            .entry(from.0)
            .or_insert_with(|| TierDecl::sized(0))
            .edges
            .entry(from.1)
            .or_default()
            .push(TierPosition {
                tier: to.0,
                position: to.1,
            });

        self
    }

    /// Assigns an intrinsic value to a position.
    pub fn primitive(mut self, at: (Tier, Position), value: Value) -> Self {
        self.tiers
            .entry(at.0)
            .or_insert_with(|| TierDecl::sized(0))
            .primitives
            .insert(at.1, value);

        self
    }

    /// Marks a position unreachable in the game.
    pub fn illegal(mut self, at: (Tier, Position)) -> Self {
        self.tiers
            .entry(at.0)
            .or_insert_with(|| TierDecl::sized(0))
            .illegal
            .insert(at.1);

        self
    }

    /// Folds a position onto the canonical representative of its symmetry
    /// class within its own tier.
    pub fn fold(mut self, at: (Tier, Position), onto: Position) -> Self {
        self.tiers
            .entry(at.0)
            .or_insert_with(|| TierDecl::sized(0))
            .folds
            .insert(at.1, onto);

        self
    }

    /// Declares `sym` as a symmetric view of `canonical`, with `map[i]`
    /// being the canonical image of the symmetric position `i`.
    pub fn symmetric(
        mut self,
        sym: Tier,
        canonical: Tier,
        map: Vec<Position>,
    ) -> Self {
        let mut inverse = vec![0; map.len()];
        for (position, &image) in map.iter().enumerate() {
            inverse[image as usize] = position as Position;
        }

        self.symmetric.insert(
            sym,
            Symmetry {
                canonical,
                to_canonical: map,
                from_canonical: inverse,
            },
        );

        self
    }

    /// Like [`SessionBuilder::symmetric`], but with both directions given
    /// explicitly, so tests can declare maps that are not involutions.
    pub fn symmetric_raw(
        mut self,
        sym: Tier,
        canonical: Tier,
        to_canonical: Vec<Position>,
        from_canonical: Vec<Position>,
    ) -> Self {
        self.symmetric.insert(
            sym,
            Symmetry {
                canonical,
                to_canonical,
                from_canonical,
            },
        );

        self
    }

    /// Exposes analytic parent generation computed from the declared edges
    /// (instead of forcing the solver's reverse-graph fallback).
    pub fn parents(mut self, analytic: bool) -> Self {
        self.analytic = analytic;
        self
    }

    /// Drops one parent from one child's analytic answer.
    pub fn forget_parent(
        mut self,
        child: (Tier, Position),
        parent: Position,
    ) -> Self {
        self.forgotten.push((
            TierPosition {
                tier: child.0,
                position: child.1,
            },
            parent,
        ));

        self
    }

    /// Injects a spurious parent (in `parent_tier`) into one child's
    /// analytic answer.
    pub fn adopt_parent(
        mut self,
        child: (Tier, Position),
        parent_tier: Tier,
        parent: Position,
    ) -> Self {
        self.adopted.push((
            TierPosition {
                tier: child.0,
                position: child.1,
            },
            parent_tier,
            parent,
        ));

        self
    }

    /// Breaks the identity of the tier-symmetry map on `tier`'s own tier.
    pub fn broken_self_map(mut self, tier: Tier) -> Self {
        self.broken_self_maps.insert(tier);
        self
    }

    /// Sets the game's starting position.
    pub fn start(mut self, at: (Tier, Position)) -> Self {
        self.start = Some(TierPosition {
            tier: at.0,
            position: at.1,
        });

        self
    }

    /// Checks the declaration for consistency and builds the session.
    pub fn build(self) -> Result<Session> {
        let start = self.start.ok_or_else(|| GameError::MockViolation {
            hint: "No starting position declared.".into(),
        })?;

        for (tier, decl) in &self.tiers {
            for (&from, children) in &decl.edges {
                if from >= decl.size {
                    return Err(GameError::MockViolation {
                        hint: format!(
                            "Edge source {from} exceeds the size of tier \
                            {tier}.",
                        ),
                    }
                    .into());
                }

                for child in children {
                    let bound = self
                        .tiers
                        .get(&child.tier)
                        .map(|d| d.size)
                        .or_else(|| {
                            self.symmetric
                                .get(&child.tier)
                                .map(|s| s.to_canonical.len() as u64)
                        });

                    match bound {
                        Some(bound) if child.position < bound => (),
                        _ => {
                            return Err(GameError::MockViolation {
                                hint: format!(
                                    "Edge into undeclared slot {} of tier {}.",
                                    child.position, child.tier,
                                ),
                            }
                            .into())
                        },
                    }
                }
            }
        }

        for symmetry in self.symmetric.values() {
            let canonical_size = self
                .tiers
                .get(&symmetry.canonical)
                .map(|d| d.size)
                .unwrap_or(0);

            if symmetry.to_canonical.len() as u64 != canonical_size {
                return Err(GameError::MockViolation {
                    hint: "Symmetric tier map size mismatch.".into(),
                }
                .into());
            }
        }

        let mut session = Session {
            name: self.name,
            tiers: self.tiers,
            symmetric: self.symmetric,
            start,
            parents: None,
            broken_self_maps: self.broken_self_maps,
        };

        if self.analytic {
            let mut parents: HashMap<(TierPosition, Tier), Vec<Position>> =
                HashMap::new();

            for (&tier, decl) in &session.tiers {
                for position in 0..decl.size {
                    let state = TierPosition { tier, position };
                    if !session.is_legal(state)
                        || session.canonical_position(state) != position
                    {
                        continue;
                    }

                    for child in session.canonical_children(state) {
                        parents
                            .entry((child, tier))
                            .or_default()
                            .push(position);
                    }
                }
            }

            for (child, parent) in &self.forgotten {
                for (key, bag) in parents.iter_mut() {
                    if key.0 == *child {
                        bag.retain(|p| p != parent);
                    }
                }
            }

            for &(child, parent_tier, parent) in &self.adopted {
                parents
                    .entry((child, parent_tier))
                    .or_default()
                    .push(parent);
            }

            session.parents = Some(parents);
        }

        Ok(session)
    }
}

/* SESSION IMPLEMENTATION */

impl Session {
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn decl(&self, tier: Tier) -> Option<&TierDecl> {
        self.tiers.get(&tier)
    }
}

impl TierDecl {
    fn sized(size: u64) -> Self {
        Self {
            size,
            kind: TierType::Loopy,
            edges: HashMap::new(),
            primitives: HashMap::new(),
            illegal: HashSet::new(),
            folds: HashMap::new(),
        }
    }
}

impl TierGame for Session {
    fn initial_tier(&self) -> Tier {
        self.start.tier
    }

    fn initial_position(&self) -> TierPosition {
        self.start
    }

    fn tier_size(&self, tier: Tier) -> u64 {
        if let Some(decl) = self.decl(tier) {
            decl.size
        } else if let Some(symmetry) = self.symmetric.get(&tier) {
            symmetry.to_canonical.len() as u64
        } else {
            0
        }
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        let mut children = self
            .decl(tier)
            .map(|decl| {
                decl.edges
                    .values()
                    .flatten()
                    .map(|child| child.tier)
                    .filter(|&child| child != tier)
                    .collect::<Vec<Tier>>()
            })
            .unwrap_or_default();

        children.sort_unstable();
        children.dedup();
        children
    }

    fn generate_moves(&self, state: TierPosition) -> Vec<Move> {
        let count = self
            .decl(state.tier)
            .and_then(|decl| decl.edges.get(&state.position))
            .map(|children| children.len())
            .unwrap_or(0);

        (0..count as Move).collect()
    }

    fn do_move(&self, state: TierPosition, mv: Move) -> TierPosition {
        self.decl(state.tier)
            .and_then(|decl| decl.edges.get(&state.position))
            .expect("Move made at a position with no declared edges.")
            [mv as usize]
    }

    fn primitive(&self, state: TierPosition) -> Value {
        self.decl(state.tier)
            .and_then(|decl| decl.primitives.get(&state.position))
            .copied()
            .unwrap_or(Value::Undecided)
    }

    fn is_legal(&self, state: TierPosition) -> bool {
        if let Some(decl) = self.decl(state.tier) {
            state.position < decl.size
                && !decl.illegal.contains(&state.position)
        } else if let Some(symmetry) = self.symmetric.get(&state.tier) {
            (state.position as usize) < symmetry.to_canonical.len()
                && self.is_legal(TierPosition {
                    tier: symmetry.canonical,
                    position: symmetry.to_canonical[state.position as usize],
                })
        } else {
            false
        }
    }

    fn canonical_position(&self, state: TierPosition) -> Position {
        self.decl(state.tier)
            .and_then(|decl| decl.folds.get(&state.position))
            .copied()
            .unwrap_or(state.position)
    }

    fn canonical_parents(
        &self,
        child: TierPosition,
        parent_tier: Tier,
    ) -> Option<Vec<Position>> {
        self.parents.as_ref().map(|parents| {
            parents
                .get(&(child, parent_tier))
                .cloned()
                .unwrap_or_default()
        })
    }

    fn position_in_symmetric_tier(
        &self,
        state: TierPosition,
        symmetric: Tier,
    ) -> Position {
        if symmetric == state.tier {
            if self.broken_self_maps.contains(&state.tier) {
                return state.position + 1;
            }

            return state.position;
        }

        if let Some(symmetry) = self.symmetric.get(&state.tier) {
            if symmetry.canonical == symmetric {
                return symmetry.to_canonical[state.position as usize];
            }
        }

        if let Some(symmetry) = self.symmetric.get(&symmetric) {
            if symmetry.canonical == state.tier {
                return symmetry.from_canonical[state.position as usize];
            }
        }

        state.position
    }

    fn canonical_tier(&self, tier: Tier) -> Tier {
        self.symmetric
            .get(&tier)
            .map(|symmetry| symmetry.canonical)
            .unwrap_or(tier)
    }

    fn tier_type(&self, tier: Tier) -> TierType {
        let tier = self.canonical_tier(tier);
        self.decl(tier)
            .map(|decl| decl.kind)
            .unwrap_or(TierType::Loopy)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn builder_rejects_inconsistent_declarations() {
        let no_start = SessionBuilder::new("no-start")
            .tier(0, 1)
            .build();

        assert!(no_start.is_err());
        let dangling = SessionBuilder::new("dangling")
            .tier(0, 1)
            .edge((0, 0), (1, 0))
            .start((0, 0))
            .build();

        assert!(dangling.is_err());
    }

    #[test]
    fn symmetric_views_translate_both_ways() -> Result<()> {
        let game = SessionBuilder::new("mirror")
            .tier(1, 3)
            .symmetric(2, 1, vec![2, 0, 1])
            .primitive((1, 0), Value::Win)
            .start((1, 0))
            .build()?;

        assert_eq!(game.canonical_tier(2), 1);
        assert_eq!(game.tier_size(2), 3);

        let sym = TierPosition {
            tier: 2,
            position: 0,
        };

        let image = game.position_in_symmetric_tier(sym, 1);
        assert_eq!(image, 2);
        assert_eq!(
            game.position_in_symmetric_tier(
                TierPosition {
                    tier: 1,
                    position: image,
                },
                2,
            ),
            0,
        );

        Ok(())
    }

    #[test]
    fn analytic_parents_invert_declared_edges() -> Result<()> {
        let game = SessionBuilder::new("edges")
            .tier(1, 2)
            .tier(0, 2)
            .primitive((1, 0), Value::Win)
            .primitive((1, 1), Value::Lose)
            .edge((0, 0), (1, 0))
            .edge((0, 1), (1, 0))
            .edge((0, 1), (1, 1))
            .parents(true)
            .start((0, 0))
            .build()?;

        let child = TierPosition {
            tier: 1,
            position: 0,
        };

        assert_eq!(game.canonical_parents(child, 0), Some(vec![0, 1]));
        assert_eq!(
            game.canonical_parents(
                TierPosition {
                    tier: 1,
                    position: 1,
                },
                0,
            ),
            Some(vec![1]),
        );

        Ok(())
    }
}
