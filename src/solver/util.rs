//! # Solver Utilities Module
//!
//! This module makes room for common utility routines used throughout the
//! `crate::solver` module, chiefly discovery and ordering of the tier DAG
//! underlying a game.

use anyhow::Result;

use std::collections::HashMap;
use std::collections::VecDeque;

use crate::game::Tier;
use crate::game::TierGame;
use crate::game::error::GameError;

/* TIER GRAPH DISCOVERY */

/// Discovers every canonical tier reachable from `game`'s initial tier and
/// returns the canonical child edges of each. Symmetric child tiers are
/// folded onto their canonical representatives, and in-tier edges are
/// dropped (in-tier structure is the solver's concern, not the graph's).
pub fn tier_graph(game: &dyn TierGame) -> Result<HashMap<Tier, Vec<Tier>>> {
    let start = game.canonical_tier(game.initial_tier());
    let mut graph = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(tier) = queue.pop_front() {
        if graph.contains_key(&tier) {
            continue;
        }

        let mut children = game
            .child_tiers(tier)
            .into_iter()
            .map(|child| game.canonical_tier(child))
            .filter(|&child| child != tier)
            .collect::<Vec<Tier>>();

        children.sort_unstable();
        children.dedup();
        queue.extend(children.iter().copied());
        graph.insert(tier, children);
    }

    Ok(graph)
}

/// Returns the canonical tiers of `game` ordered parents-first; reversing
/// the result gives a valid bottom-up solving order.
///
/// # Errors
///
/// Fails if the tier graph contains a cycle, which violates the layering
/// contract of tiered games.
pub fn tier_order(game: &dyn TierGame) -> Result<Vec<Tier>> {
    let graph = tier_graph(game)?;
    let mut indegree: HashMap<Tier, usize> =
        graph.keys().map(|&t| (t, 0)).collect();

    for children in graph.values() {
        for child in children {
            *indegree
                .get_mut(child)
                .expect("Tier graph edge into undiscovered tier.") += 1;
        }
    }

    let mut queue = indegree
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&tier, _)| tier)
        .collect::<VecDeque<Tier>>();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(tier) = queue.pop_front() {
        order.push(tier);
        for &child in &graph[&tier] {
            let count = indegree
                .get_mut(&child)
                .expect("Tier graph edge into undiscovered tier.");

            *count -= 1;
            if *count == 0 {
                queue.push_back(child);
            }
        }
    }

    if order.len() != graph.len() {
        return Err(GameError::ApiViolation {
            hint: "The graph of tiers contains a cycle.".into(),
        }
        .into());
    }

    Ok(order)
}

/// Returns, for each canonical tier of `game`, the canonical tiers that
/// reach it in one move. Used to drive parent-side conformance checks.
pub fn parent_map(game: &dyn TierGame) -> Result<HashMap<Tier, Vec<Tier>>> {
    let graph = tier_graph(game)?;
    let mut parents: HashMap<Tier, Vec<Tier>> =
        graph.keys().map(|&t| (t, Vec::new())).collect();

    for (&tier, children) in &graph {
        for child in children {
            parents
                .get_mut(child)
                .expect("Tier graph edge into undiscovered tier.")
                .push(tier);
        }
    }

    for list in parents.values_mut() {
        list.sort_unstable();
    }

    Ok(parents)
}
