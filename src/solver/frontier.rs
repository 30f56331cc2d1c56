//! # Solver Frontier Module
//!
//! A frontier holds solved positions that still owe their contribution to
//! the decisions of their parents. Positions are bucketed by remoteness so
//! propagation can proceed level by level, and each bucket tracks a
//! *dividers* array: one cumulative count per originating child tier, which
//! recovers the tier a record came from out of its linear offset alone.

use std::mem;

use crate::game::Position;
use crate::solver::REMOTENESS_MAX;
use crate::solver::Remoteness;
use crate::solver::error::SolverError;

/* DEFINITIONS */

/// Append-only store of solved positions keyed by remoteness. One frontier
/// belongs to exactly one worker thread; cross-thread aggregation happens by
/// draining levels after parallel phases complete.
pub(crate) struct Frontier {
    buckets: Vec<Bucket>,
}

/// One remoteness level. Records are grouped by originating child-tier
/// index in insertion order; `dividers[i]` counts records with child index
/// `<= i` once accumulated.
struct Bucket {
    positions: Vec<Position>,
    dividers: Vec<u64>,
}

/* IMPLEMENTATION */

impl Frontier {
    /// Allocates empty buckets for every representable remoteness, each
    /// with a dividers axis of `dividers` child-tier slots.
    pub fn new(dividers: usize) -> Result<Self, SolverError> {
        let count = REMOTENESS_MAX as usize + 1;
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(count)
            .map_err(|_| SolverError::OutOfMemory {
                what: "frontier buckets",
            })?;

        for _ in 0..count {
            buckets.push(Bucket {
                positions: Vec::new(),
                dividers: vec![0; dividers],
            });
        }

        Ok(Self { buckets })
    }

    /// Appends `position` to the bucket at `remoteness`, attributed to the
    /// child tier at `child`.
    ///
    /// Within one bucket, calls must be non-decreasing in `child` until
    /// [`Frontier::accumulate_dividers`] runs; afterwards, only the last
    /// child index may be used. Both are guaranteed by the solver's phase
    /// structure, not checked here.
    pub fn add(
        &mut self,
        position: Position,
        remoteness: Remoteness,
        child: usize,
    ) -> Result<(), SolverError> {
        let bucket = &mut self.buckets[remoteness as usize];
        if bucket.positions.len() == bucket.positions.capacity() {
            bucket
                .positions
                .try_reserve(1)
                .map_err(|_| SolverError::OutOfMemory {
                    what: "frontier bucket storage",
                })?;
        }

        bucket.positions.push(position);
        bucket.dividers[child] += 1;
        Ok(())
    }

    /// Turns every bucket's per-child counts into cumulative counts. Called
    /// once, after the loading and scanning phases stop inserting interior
    /// child indices.
    pub fn accumulate_dividers(&mut self) {
        for bucket in &mut self.buckets {
            let mut total = 0;
            for count in &mut bucket.dividers {
                total += *count;
                *count = total;
            }
        }
    }

    /// Moves the bucket at `remoteness` out of the frontier, releasing its
    /// storage to the caller. Returns the positions in insertion order and
    /// the accumulated dividers row that maps offsets to child indices.
    pub fn take_level(
        &mut self,
        remoteness: Remoteness,
    ) -> (Vec<Position>, Vec<u64>) {
        let bucket = &mut self.buckets[remoteness as usize];
        (
            mem::take(&mut bucket.positions),
            mem::take(&mut bucket.dividers),
        )
    }
}

/// Recovers the child-tier index of the record at linear `offset` within a
/// bucket from the bucket's accumulated dividers row.
pub(crate) fn child_index(dividers: &[u64], offset: usize) -> usize {
    dividers.partition_point(|&d| d <= offset as u64)
}
