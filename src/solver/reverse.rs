//! # Solver Reverse Graph Module
//!
//! When a game cannot produce parents analytically, the solver records the
//! parent relation while it enumerates children during the tier scan: every
//! `(parent, child)` edge discovered forward is appended here in reverse.
//! The structure lives for exactly one tier solve, and each child's parent
//! bag is popped (moved out) exactly once by frontier propagation.

use dashmap::DashMap;

use crate::game::Position;
use crate::game::TierPosition;

/* DEFINITIONS */

/// A concurrent child-to-parents multimap. All parents belong to the tier
/// being solved; children may be anywhere.
#[derive(Default)]
pub(crate) struct ReverseGraph {
    parents: DashMap<TierPosition, Vec<Position>>,
}

/* IMPLEMENTATION */

impl ReverseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `parent` as a predecessor of `child`. Safe to call from
    /// parallel scan workers.
    pub fn add(&self, child: TierPosition, parent: Position) {
        self.parents
            .entry(child)
            .or_default()
            .push(parent);
    }

    /// Removes and returns the parents of `child`. A child with no
    /// recorded parents yields an empty bag.
    pub fn pop(&self, child: TierPosition) -> Vec<Position> {
        self.parents
            .remove(&child)
            .map(|(_, parents)| parents)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parent_bags_pop_exactly_once() {
        let graph = ReverseGraph::new();
        let child = TierPosition {
            tier: 2,
            position: 9,
        };

        graph.add(child, 4);
        graph.add(child, 6);

        let mut parents = graph.pop(child);
        parents.sort_unstable();
        assert_eq!(parents, vec![4, 6]);
        assert!(graph.pop(child).is_empty());
    }

    #[test]
    fn distinct_children_keep_distinct_bags() {
        let graph = ReverseGraph::new();
        let a = TierPosition {
            tier: 0,
            position: 1,
        };

        let b = TierPosition {
            tier: 1,
            position: 1,
        };

        graph.add(a, 5);
        graph.add(b, 7);
        assert_eq!(graph.pop(a), vec![5]);
        assert_eq!(graph.pop(b), vec![7]);
    }
}
