//! Flood-fill reachability over a hypothetical board state.
//!
//! A [`Snapshot`] pairs the tick's grid with a simulated actor. The grid still
//! shows the pre-move body, so passability is decided by the simulated actor:
//! a cell is open when it is inside the grid, not `Border`, and not occupied by
//! the simulated body. The vacated tail therefore counts as open.
//!
//! [`Reachability`] memoises regions per `(start, epoch)` for exactly one
//! decision. Each candidate move gets its own epoch because its simulated body
//! differs from its siblings'.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::{AHashSet, RandomState};
use dashmap::DashMap;

use crate::actor::Actor;
use crate::grid::{CellKind, Grid, Position};

pub type Region = AHashSet<Position>;

/// A read-only view of the grid plus one hypothetical actor state.
#[derive(Debug)]
pub struct Snapshot<'a> {
    epoch: u32,
    grid: &'a Grid,
    actor: Actor,
    occupied: AHashSet<Position>,
}

impl<'a> Snapshot<'a> {
    pub fn new(grid: &'a Grid, actor: Actor, epoch: u32) -> Self {
        let occupied = actor.body().iter().copied().collect();
        Self {
            epoch,
            grid,
            actor,
            occupied,
        }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.occupied.contains(&pos)
    }

    /// Open for flood fill: in bounds, not border, not under the simulated body.
    pub fn is_passable(&self, pos: Position) -> bool {
        self.grid.in_bounds(pos)
            && self.grid.classify(pos) != CellKind::Border
            && !self.is_occupied(pos)
    }
}

/// Breadth-first flood fill from `start`.
///
/// The start cell is always part of the result, even when it is itself
/// blocked (the simulated head usually is).
pub fn flood_fill(snapshot: &Snapshot<'_>, start: Position) -> Region {
    let mut visited = AHashSet::new();
    let mut queue = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for neighbor in pos.neighbors() {
            if !visited.contains(&neighbor) && snapshot.is_passable(neighbor) {
                visited.insert(neighbor);
                queue.push_back(neighbor);
            }
        }
    }

    visited
}

/// Per-decision memo of flood-fill results, safe to share across the
/// candidate tasks of one tick.
///
/// Two tasks may race to compute the same key; both produce the same region,
/// so whichever insert lands last is as good as the first.
#[derive(Debug, Default)]
pub struct Reachability {
    regions: DashMap<(Position, u32), Arc<Region>, RandomState>,
}

impl Reachability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Region reachable from `start` in `snapshot`, computed at most once per
    /// connected component.
    pub fn region(&self, snapshot: &Snapshot<'_>, start: Position) -> Arc<Region> {
        let epoch = snapshot.epoch();
        if let Some(hit) = self.regions.get(&(start, epoch)) {
            return Arc::clone(hit.value());
        }

        let region = Arc::new(flood_fill(snapshot, start));
        if snapshot.is_passable(start) {
            // Every member of an open component floods to the same component.
            for &member in region.iter() {
                self.regions.insert((member, epoch), Arc::clone(&region));
            }
        } else {
            self.regions.insert((start, epoch), Arc::clone(&region));
        }
        region
    }

    pub fn area(&self, snapshot: &Snapshot<'_>, start: Position) -> usize {
        self.region(snapshot, start).len()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn clear(&self) {
        self.regions.clear();
    }
}
