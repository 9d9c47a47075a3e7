use rand::{Rng, RngCore, seq::IndexedRandom};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::evaluator::{Evaluator, HeuristicSet, MoveContext, ScoringWeights};
use crate::grid::{CellKind, Direction, Grid, Position};
use crate::reachability::{Reachability, Snapshot};
use crate::safety::is_safe;
use crate::{Actor, Agent, GameView};

/// The decision engine: enumerate candidate moves, keep the safe ones, pick
/// the best scoring one, and degrade gracefully when nothing is safe.
#[derive(Debug, Clone)]
pub struct Strategy {
    name: String,
    evaluator: Evaluator,
}

impl Strategy {
    /// A strategy over the standard heuristic set.
    pub fn new(weights: ScoringWeights) -> color_eyre::Result<Self> {
        Self::with_heuristics(HeuristicSet::standard(), weights)
    }

    pub fn with_heuristics(
        heuristics: HeuristicSet,
        weights: ScoringWeights,
    ) -> color_eyre::Result<Self> {
        Ok(Self {
            name: "Strategy".to_string(),
            evaluator: Evaluator::new(heuristics, weights)?,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_weights(&mut self, weights: ScoringWeights) -> color_eyre::Result<()> {
        self.evaluator.set_weights(weights)
    }

    pub fn weights(&self) -> &ScoringWeights {
        self.evaluator.weights()
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Chooses the direction for this tick.
    ///
    /// Never fails: with no valid move at all the answer is a uniformly random
    /// direction drawn from `rng`, and the collision that follows ends the
    /// episode in the driving loop.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        grid: &Grid,
        actor: &Actor,
        food: Position,
        previous: Option<Direction>,
        rng: &mut R,
    ) -> Direction {
        let candidates = valid_moves(grid, actor, previous);
        if candidates.is_empty() {
            let direction = *Direction::ALL.choose(rng).unwrap_or(&Direction::Up);
            debug!(head = %actor.head(), %direction, "boxed in, picking a random direction");
            return direction;
        }

        // Scoped to this call: the grid changes between ticks.
        let reach = Reachability::new();
        let snapshots: Vec<Snapshot<'_>> = candidates
            .iter()
            .enumerate()
            .map(|(epoch, &dir)| Snapshot::new(grid, actor.moved(dir), epoch as u32))
            .collect();

        let safe: Vec<bool> = snapshots
            .par_iter()
            .map(|snapshot| is_safe(snapshot, &reach, actor.len()))
            .collect();

        let scored = candidates
            .iter()
            .zip(&snapshots)
            .zip(&safe)
            .filter(|&(_, &safe)| safe)
            .map(|((&dir, snapshot), _)| {
                let ctx = MoveContext {
                    snapshot,
                    reach: &reach,
                    food,
                };
                (dir, self.evaluator.score(&ctx))
            });
        if let Some(direction) = first_max(scored) {
            trace!(%direction, cached = reach.len(), "picked best safe move");
            return direction;
        }

        let by_space = candidates
            .iter()
            .zip(&snapshots)
            .map(|(&dir, snapshot)| (dir, reach.area(snapshot, snapshot.actor().head()) as f64));
        let direction = first_max(by_space).unwrap_or(candidates[0]);
        debug!(
            head = %actor.head(),
            %direction,
            candidates = candidates.len(),
            "no safe move, falling back to the roomiest one"
        );
        direction
    }
}

impl Agent for Strategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&self, view: &GameView<'_>, rng: &mut dyn RngCore) -> Direction {
        self.decide(view.grid, view.actor, view.food, view.previous, rng)
    }
}

/// Directions that neither reverse the previous one nor run straight into the
/// border or the actor's own body, in `Direction::ALL` order.
pub fn valid_moves(grid: &Grid, actor: &Actor, previous: Option<Direction>) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|&dir| previous.map(Direction::opposite) != Some(dir))
        .filter(|&dir| {
            let next = actor.next_head(dir);
            grid.in_bounds(next)
                && grid.classify(next) != CellKind::Border
                && !actor.would_collide_with_self(dir)
        })
        .collect()
}

/// The first item with the strictly greatest score.
fn first_max<T>(items: impl IntoIterator<Item = (T, f64)>) -> Option<T> {
    let mut best: Option<(T, f64)> = None;
    for (item, score) in items {
        if best.as_ref().is_none_or(|&(_, top)| score > top) {
            best = Some((item, score));
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn food_only() -> Strategy {
        Strategy::new(ScoringWeights::unit(5, 1)).unwrap()
    }

    #[test]
    fn test_valid_moves_skip_reverse_border_and_body() {
        let mut grid = Grid::square(6).unwrap();
        let actor = Actor::from_body([Position::new(1, 2), Position::new(2, 2)]);
        grid.rebuild(&actor, None);

        assert_eq!(
            valid_moves(&grid, &actor, Some(Direction::Up)),
            vec![Direction::Left, Direction::Right]
        );
        assert_eq!(
            valid_moves(&grid, &actor, None),
            vec![Direction::Left, Direction::Right]
        );
        let single = Actor::new(Position::new(2, 2));
        assert_eq!(valid_moves(&grid, &single, Some(Direction::Right)).len(), 3);
    }

    #[test]
    fn test_first_max_prefers_earliest_on_ties() {
        let picked = first_max([("a", 1.0), ("b", 3.0), ("c", 3.0), ("d", 2.0)]);
        assert_eq!(picked, Some("b"));
        assert_eq!(first_max(Vec::<(u8, f64)>::new()), None);
        assert_eq!(first_max([(1, f64::INFINITY), (2, f64::INFINITY)]), Some(1));
    }

    #[test]
    fn test_ties_resolve_in_enumeration_order() {
        let mut grid = Grid::square(10).unwrap();
        let actor = Actor::new(Position::new(1, 1));
        let food = Position::new(5, 5);
        grid.rebuild(&actor, Some(food));
        let mut rng = StdRng::seed_from_u64(0);
        // Down and Right both close the distance by one.
        assert_eq!(
            food_only().decide(&grid, &actor, food, None, &mut rng),
            Direction::Down
        );
    }

    #[test]
    fn test_eats_adjacent_food() {
        let mut grid = Grid::square(10).unwrap();
        let actor = Actor::from_body([Position::new(4, 4), Position::new(4, 3)]);
        let food = Position::new(5, 4);
        grid.rebuild(&actor, Some(food));
        let strategy = Strategy::new(ScoringWeights::new(vec![5.0, 0.0, 0.0, 3.0, 1.0])).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            strategy.decide(&grid, &actor, food, Some(Direction::Right), &mut rng),
            Direction::Down
        );
    }

    #[test]
    fn test_boxed_in_returns_seeded_random_direction() {
        // Head in the corner of a 3x3 interior with every exit blocked.
        let mut grid = Grid::square(5).unwrap();
        let actor = Actor::from_body([
            Position::new(1, 1),
            Position::new(1, 2),
            Position::new(2, 2),
            Position::new(2, 1),
        ]);
        grid.rebuild(&actor, Some(Position::new(3, 3)));
        assert!(valid_moves(&grid, &actor, Some(Direction::Up)).is_empty());

        let strategy = food_only();
        let picks = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..8)
                .map(|_| {
                    strategy.decide(&grid, &actor, Position::new(3, 3), Some(Direction::Up), &mut rng)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(11), picks(11));
    }

    #[test]
    fn test_fallback_picks_roomiest_unsafe_move() {
        // Head on the top row between two pockets, both smaller than the body.
        // Food sits in the left pocket, yet the fallback ignores the evaluator.
        let mut grid = Grid::square(7).unwrap();
        let actor = Actor::from_body([
            Position::new(1, 3),
            Position::new(2, 3),
            Position::new(2, 2),
            Position::new(2, 1),
            Position::new(3, 1),
            Position::new(3, 2),
            Position::new(3, 3),
            Position::new(3, 4),
            Position::new(3, 5),
            Position::new(4, 5),
        ]);
        let food = Position::new(1, 1);
        grid.rebuild(&actor, Some(food));
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            valid_moves(&grid, &actor, Some(Direction::Up)),
            vec![Direction::Left, Direction::Right]
        );
        assert_eq!(
            food_only().decide(&grid, &actor, food, Some(Direction::Up), &mut rng),
            Direction::Right
        );
    }
}
