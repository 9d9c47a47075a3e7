use coil::{Agent, Direction, GameView, strategy::valid_moves};
use rand::{RngCore, seq::IndexedRandom};

/// A simple agent that picks a random valid move each turn.
/// Useful as a baseline for benchmarking.
pub struct RandomAgent {
    name: String,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self {
            name: "Random".to_string(),
        }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&self, view: &GameView<'_>, rng: &mut dyn RngCore) -> Direction {
        let moves = valid_moves(view.grid, view.actor, view.previous);
        if let Some(&mv) = moves.choose(rng) {
            return mv;
        }

        // Last resort: random direction (the actor is boxed in anyway)
        *Direction::ALL.choose(rng).unwrap_or(&Direction::Up)
    }
}
