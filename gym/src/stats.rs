use coil::{EndReason, EpisodeOutcome};
use serde::{Deserialize, Serialize};

/// Result of a single game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub seed: u64,
    /// One outcome per agent, in agent order
    pub outcomes: Vec<EpisodeOutcome>,
    /// Index of the agent with the strictly longest final length, or None on a tie
    pub winner: Option<usize>,
}

impl GameResult {
    pub fn new(seed: u64, outcomes: Vec<EpisodeOutcome>) -> Self {
        let best = outcomes.iter().map(|o| o.length).max();
        let mut leaders = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| Some(o.length) == best)
            .map(|(i, _)| i);
        let winner = match (leaders.next(), leaders.next()) {
            (Some(i), None) => Some(i),
            _ => None,
        };
        Self {
            seed,
            outcomes,
            winner,
        }
    }
}

/// How episodes ended, per reason
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EndCounts {
    pub wall: u32,
    pub self_collision: u32,
    pub looped: u32,
    pub step_cap: u32,
    pub board_full: u32,
}

impl EndCounts {
    pub fn record(&mut self, end: EndReason) {
        let slot = match end {
            EndReason::Wall => &mut self.wall,
            EndReason::SelfCollision => &mut self.self_collision,
            EndReason::Looped => &mut self.looped,
            EndReason::StepCap => &mut self.step_cap,
            EndReason::BoardFull => &mut self.board_full,
        };
        *slot += 1;
    }

    /// Crashes into the border or the body
    pub fn deaths(&self) -> u32 {
        self.wall + self.self_collision
    }
}

/// Aggregated statistics for an agent
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentStats {
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_games: u32,
    pub total_length: u64,
    pub total_steps: u64,
    pub min_length: usize,
    pub max_length: usize,
    pub ends: EndCounts,
}

impl AgentStats {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &EpisodeOutcome) {
        self.min_length = if self.total_games == 0 {
            outcome.length
        } else {
            self.min_length.min(outcome.length)
        };
        self.max_length = self.max_length.max(outcome.length);
        self.total_games += 1;
        self.total_length += outcome.length as u64;
        self.total_steps += outcome.steps as u64;
        self.ends.record(outcome.end);
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.wins as f64 / self.total_games as f64
        }
    }

    pub fn mean_length(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.total_length as f64 / self.total_games as f64
        }
    }

    pub fn mean_steps(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.total_steps as f64 / self.total_games as f64
        }
    }
}

/// Tournament statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TournamentStats {
    pub agent_stats: Vec<AgentStats>,
    pub total_games: u32,
    pub total_draws: u32,
}

impl TournamentStats {
    /// Compute statistics from game results
    pub fn from_results(results: &[GameResult], agent_names: &[String]) -> Self {
        let mut agent_stats: Vec<AgentStats> = agent_names
            .iter()
            .map(|name| AgentStats::new(name.clone()))
            .collect();

        let mut total_draws = 0u32;

        for result in results {
            for (stats, outcome) in agent_stats.iter_mut().zip(&result.outcomes) {
                stats.record(outcome);
            }

            match result.winner {
                Some(winner_idx) if winner_idx < agent_stats.len() => {
                    for (i, stats) in agent_stats.iter_mut().enumerate() {
                        if i == winner_idx {
                            stats.wins += 1;
                        } else {
                            stats.losses += 1;
                        }
                    }
                }
                _ => {
                    total_draws += 1;
                    for stats in agent_stats.iter_mut() {
                        stats.draws += 1;
                    }
                }
            }
        }

        Self {
            agent_stats,
            total_games: results.len() as u32,
            total_draws,
        }
    }

    /// Print a formatted summary table
    pub fn print_summary(&self) {
        use colored::Colorize;
        use tabled::{Table, Tabled};

        #[derive(Tabled)]
        struct Row {
            #[tabled(rename = "Agent")]
            name: String,
            #[tabled(rename = "Wins")]
            wins: u32,
            #[tabled(rename = "Draws")]
            draws: u32,
            #[tabled(rename = "Win Rate")]
            win_rate: String,
            #[tabled(rename = "Mean Length")]
            mean_length: String,
            #[tabled(rename = "Min")]
            min_length: usize,
            #[tabled(rename = "Max")]
            max_length: usize,
            #[tabled(rename = "Mean Steps")]
            mean_steps: String,
            #[tabled(rename = "Wall")]
            wall: u32,
            #[tabled(rename = "Self")]
            self_collision: u32,
            #[tabled(rename = "Loop")]
            looped: u32,
            #[tabled(rename = "Cap")]
            step_cap: u32,
            #[tabled(rename = "Full")]
            board_full: u32,
        }

        let rows: Vec<Row> = self
            .agent_stats
            .iter()
            .map(|s| Row {
                name: s.name.clone(),
                wins: s.wins,
                draws: s.draws,
                win_rate: format!("{:.1}%", s.win_rate() * 100.0),
                mean_length: format!("{:.2}", s.mean_length()),
                min_length: s.min_length,
                max_length: s.max_length,
                mean_steps: format!("{:.1}", s.mean_steps()),
                wall: s.ends.wall,
                self_collision: s.ends.self_collision,
                looped: s.ends.looped,
                step_cap: s.ends.step_cap,
                board_full: s.ends.board_full,
            })
            .collect();

        let table = Table::new(rows).to_string();

        println!("\n{}", "=== Tournament Results ===".green().bold());
        println!("{}", table);
        println!();
        println!(
            "Total games: {} | Draws: {}",
            self.total_games.to_string().cyan(),
            self.total_draws.to_string().yellow(),
        );
        if let Some(leader) = self
            .agent_stats
            .iter()
            .max_by(|a, b| a.mean_length().total_cmp(&b.mean_length()))
        {
            println!(
                "Longest on average: {} ({:.2})",
                leader.name.cyan(),
                leader.mean_length()
            );
        }
    }

    /// Export stats to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
