//! Snake Gym - A benchmarking framework for single-player snake agents

pub mod agents;
pub mod runner;
pub mod stats;

pub use agents::{GreedyAgent, RandomAgent};
pub use coil::{Agent, Strategy};
pub use runner::{GameConfig, run_game, run_tournament, run_tournament_parallel};
pub use stats::{AgentStats, EndCounts, GameResult, TournamentStats};
