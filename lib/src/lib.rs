pub mod actor;
pub mod episode;
pub mod evaluator;
pub mod grid;
pub mod optimizer;
pub mod reachability;
pub mod safety;
pub mod strategy;

pub use actor::Actor;
pub use episode::{EndReason, Episode, EpisodeConfig, EpisodeOutcome};
pub use evaluator::{Evaluator, Heuristic, HeuristicSet, ScoringWeights};
pub use grid::{CellKind, Direction, Grid, Position};
pub use optimizer::{
    GenerationStats, HeuristicKind, Individual, MutationSchedule, OptimizationReport, Optimizer,
    OptimizerConfig, Population,
};
pub use strategy::Strategy;

use rand::RngCore;

/// What an agent sees on one tick: the redrawn board, the actor, the food and
/// the direction chosen on the previous tick (`None` on the first).
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    pub grid: &'a Grid,
    pub actor: &'a Actor,
    pub food: Position,
    pub previous: Option<Direction>,
}

/// Trait that defines a snake agent's decision-making interface.
pub trait Agent: Send + Sync {
    /// Returns the name of this agent for display purposes.
    fn name(&self) -> &str;

    /// Choose a direction for the current tick.
    ///
    /// `rng` is the only source of randomness an agent may use, so seeded
    /// episodes replay identically.
    fn choose_move(&self, view: &GameView<'_>, rng: &mut dyn RngCore) -> Direction;

    /// Optional: Reset any internal state between games.
    fn reset(&mut self) {}
}

impl Agent for Box<dyn Agent> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn choose_move(&self, view: &GameView<'_>, rng: &mut dyn RngCore) -> Direction {
        (**self).choose_move(view, rng)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
