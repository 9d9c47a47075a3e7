use coil::{Agent, Episode, EpisodeConfig};
use rayon::prelude::*;

use crate::stats::GameResult;

/// Configuration for a batch of games
#[derive(Clone, Debug, Default)]
pub struct GameConfig {
    pub episode: EpisodeConfig,
    /// Seed of the first game; game `i` uses `seed + i`.
    pub seed: u64,
}

impl GameConfig {
    pub fn with_board_size(mut self, board_size: usize) -> Self {
        self.episode = EpisodeConfig::new(board_size);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.episode.max_steps = max_steps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn game_seed(&self, game: usize) -> u64 {
        self.seed.wrapping_add(game as u64)
    }
}

/// Plays one seeded episode per agent. Every agent sees the same spawn and
/// the same first food; the longest final length wins.
pub fn run_game(
    agents: &[&dyn Agent],
    config: &GameConfig,
    game: usize,
) -> color_eyre::Result<GameResult> {
    let seed = config.game_seed(game);
    let outcomes = agents
        .iter()
        .map(|agent| Ok(Episode::new(config.episode.clone(), seed)?.run(*agent)))
        .collect::<color_eyre::Result<Vec<_>>>()?;
    Ok(GameResult::new(seed, outcomes))
}

/// Run multiple games and collect results
pub fn run_tournament(
    agents: &[&dyn Agent],
    config: &GameConfig,
    num_games: usize,
) -> color_eyre::Result<Vec<GameResult>> {
    (0..num_games)
        .map(|game| run_game(agents, config, game))
        .collect()
}

/// Run multiple games in parallel
pub fn run_tournament_parallel(
    agents: &[&dyn Agent],
    config: &GameConfig,
    num_games: usize,
) -> color_eyre::Result<Vec<GameResult>> {
    (0..num_games)
        .into_par_iter()
        .map(|game| run_game(agents, config, game))
        .collect()
}
