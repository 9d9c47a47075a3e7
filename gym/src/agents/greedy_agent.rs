use coil::{Agent, Direction, GameView, strategy::valid_moves};
use rand::RngCore;

/// Heads straight for the food:
/// - Never reverses or steps onto the border or its own body
/// - Picks the move closest to the food, first in `Direction::ALL` order on ties
/// - Does no lookahead, so it happily walks into dead ends
pub struct GreedyAgent {
    name: String,
}

impl GreedyAgent {
    pub fn new() -> Self {
        Self {
            name: "Greedy".to_string(),
        }
    }
}

impl Default for GreedyAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for GreedyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&self, view: &GameView<'_>, _rng: &mut dyn RngCore) -> Direction {
        let head = view.actor.head();
        valid_moves(view.grid, view.actor, view.previous)
            .into_iter()
            .min_by_key(|&mv| head.step(mv).manhattan(view.food))
            .unwrap_or(view.previous.unwrap_or(Direction::Up))
    }
}
