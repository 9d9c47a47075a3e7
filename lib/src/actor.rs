use std::collections::VecDeque;

use ahash::AHashSet;

use crate::grid::{Direction, Position};

/// The snake: an ordered, head-first body of unique positions.
///
/// `advance` is the only mutation of the body. It does not look at the board;
/// bounds and border checks belong to whoever drives the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    body: VecDeque<Position>,
    pending_growth: bool,
}

impl Actor {
    /// A single-segment actor, as spawned at the start of an episode.
    pub fn new(start: Position) -> Self {
        Self {
            body: VecDeque::from([start]),
            pending_growth: false,
        }
    }

    /// Builds an actor from a head-first body.
    ///
    /// # Panics
    /// If the body is empty or visits a position twice.
    pub fn from_body(body: impl IntoIterator<Item = Position>) -> Self {
        let body: VecDeque<Position> = body.into_iter().collect();
        assert!(!body.is_empty(), "an actor needs at least one segment");
        let mut seen = AHashSet::with_capacity(body.len());
        for &segment in &body {
            assert!(seen.insert(segment), "actor body repeats position {segment}");
        }
        Self {
            body,
            pending_growth: false,
        }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn tail(&self) -> Position {
        self.body[self.body.len() - 1]
    }

    pub fn body(&self) -> &VecDeque<Position> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Always false: an actor keeps at least its head.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    pub fn has_pending_growth(&self) -> bool {
        self.pending_growth
    }

    pub fn next_head(&self, direction: Direction) -> Position {
        self.head().step(direction)
    }

    /// True iff the head would land on a cell the body occupies right now,
    /// the tail included.
    pub fn would_collide_with_self(&self, direction: Direction) -> bool {
        self.contains(self.next_head(direction))
    }

    /// Prepends the new head and drops the tail, unless growth is pending, in
    /// which case the flag is consumed and the body keeps its tail.
    pub fn advance(&mut self, direction: Direction) {
        let head = self.next_head(direction);
        self.body.push_front(head);
        if self.pending_growth {
            self.pending_growth = false;
        } else {
            self.body.pop_back();
        }
    }

    /// Marks the actor to grow by one on its next `advance`.
    pub fn grow(&mut self) {
        self.pending_growth = true;
    }

    /// The actor as it would be after `advance(direction)`.
    pub fn moved(&self, direction: Direction) -> Self {
        let mut next = self.clone();
        next.advance(direction);
        next
    }
}
