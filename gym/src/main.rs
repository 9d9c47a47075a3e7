use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::WrapErr;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use coil::{Agent, ScoringWeights, Strategy};
use gym::agents::{GreedyAgent, RandomAgent};
use gym::runner::{GameConfig, run_game};
use gym::stats::{GameResult, TournamentStats};

#[derive(Parser)]
#[command(name = "snake-gym")]
#[command(about = "Benchmarking gym for pitting the coil strategy against baseline snake agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tournament between multiple agents
    Tournament {
        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        games: usize,

        /// Agents to include in the tournament
        #[arg(short, long, value_delimiter = ',', default_value = "strategy,greedy,random")]
        agents: Vec<AgentType>,

        /// Strategy weights, one per standard heuristic
        #[arg(short, long, value_delimiter = ',', default_value = "1,2,0.5,0.5,1")]
        weights: Vec<f64>,

        /// Side length of the square board
        #[arg(short, long, default_value = "10")]
        board_size: usize,

        /// Maximum steps per game (defaults to twice the board area)
        #[arg(long)]
        max_steps: Option<usize>,

        /// Seed of the first game
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Run games in parallel
        #[arg(short, long)]
        parallel: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the strategy with the greedy baseline across board sizes
    Benchmark {
        /// Number of games per board size
        #[arg(short, long, default_value = "20")]
        games: usize,

        /// Board sizes to test
        #[arg(long, value_delimiter = ',', default_value = "6,10,14,20")]
        board_sizes: Vec<usize>,

        /// Strategy weights, one per standard heuristic
        #[arg(short, long, value_delimiter = ',', default_value = "1,2,0.5,0.5,1")]
        weights: Vec<f64>,

        /// Run games in parallel
        #[arg(short, long)]
        parallel: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq)]
enum AgentType {
    Strategy,
    Greedy,
    Random,
}

impl AgentType {
    fn create_agent(&self, weights: &ScoringWeights) -> color_eyre::Result<Box<dyn Agent>> {
        Ok(match self {
            AgentType::Strategy => Box::new(Strategy::new(weights.clone())?),
            AgentType::Greedy => Box::new(GreedyAgent::new()),
            AgentType::Random => Box::new(RandomAgent::new()),
        })
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Tournament {
            games,
            agents,
            weights,
            board_size,
            max_steps,
            seed,
            parallel,
            json,
        } => {
            let mut config = GameConfig::default().with_board_size(board_size).with_seed(seed);
            if let Some(max_steps) = max_steps {
                config = config.with_max_steps(max_steps);
            }
            run_tournament_cmd(games, &agents, weights.into(), &config, parallel, json)
        }
        Commands::Benchmark {
            games,
            board_sizes,
            weights,
            parallel,
        } => run_benchmark_cmd(games, &board_sizes, weights.into(), parallel),
    }
}

fn progress_bar(len: usize, template: &str) -> color_eyre::Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .wrap_err("invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn play(
    agents: &[&dyn Agent],
    config: &GameConfig,
    num_games: usize,
    parallel: bool,
    pb: Option<&ProgressBar>,
) -> color_eyre::Result<Vec<GameResult>> {
    let play_one = |game| {
        let result = run_game(agents, config, game);
        if let Some(pb) = pb {
            pb.inc(1);
        }
        result
    };
    if parallel {
        (0..num_games).into_par_iter().map(play_one).collect()
    } else {
        (0..num_games).map(play_one).collect()
    }
}

fn run_tournament_cmd(
    num_games: usize,
    agent_types: &[AgentType],
    weights: ScoringWeights,
    config: &GameConfig,
    parallel: bool,
    json_output: bool,
) -> color_eyre::Result<()> {
    if !json_output {
        println!("\n{}", "=== Snake Gym Tournament ===".green().bold());
        println!(
            "Games: {} | Board: {}x{} | Max steps: {}",
            num_games, config.episode.board_size, config.episode.board_size, config.episode.max_steps
        );
        println!("Parallel: {} | Weights: {}", parallel, weights);
        println!();
    }

    // Create agents
    let agents = agent_types
        .iter()
        .map(|t| t.create_agent(&weights))
        .collect::<color_eyre::Result<Vec<_>>>()?;

    let agent_refs: Vec<&dyn Agent> = agents.iter().map(|a| a.as_ref()).collect();
    let agent_names: Vec<String> = agents.iter().map(|a| a.name().to_string()).collect();

    let pb = if !json_output {
        Some(progress_bar(
            num_games,
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?)
    } else {
        None
    };

    let results = play(&agent_refs, config, num_games, parallel, pb.as_ref())?;

    if let Some(pb) = pb {
        pb.finish_with_message("Done!");
    }

    let stats = TournamentStats::from_results(&results, &agent_names);

    if json_output {
        println!("{}", stats.to_json());
    } else {
        stats.print_summary();
    }
    Ok(())
}

fn run_benchmark_cmd(
    games_per_config: usize,
    board_sizes: &[usize],
    weights: ScoringWeights,
    parallel: bool,
) -> color_eyre::Result<()> {
    println!("\n{}", "=== Snake Gym Benchmark ===".green().bold());
    println!("Testing the strategy against the greedy baseline on growing boards");
    println!("Games per config: {} | Weights: {}", games_per_config, weights);
    println!();

    let strategy = Strategy::new(weights)?;
    let greedy = GreedyAgent::new();
    let agents: Vec<&dyn Agent> = vec![&strategy, &greedy];
    let names = vec![strategy.name().to_string(), greedy.name().to_string()];

    for &size in board_sizes {
        let config = GameConfig::default().with_board_size(size);
        let pb = progress_bar(
            games_per_config,
            &format!("{{spinner:.green}} {size}x{size} [{{bar:30.cyan/blue}}] {{pos}}/{{len}}"),
        )?;

        let results = play(&agents, &config, games_per_config, parallel, Some(&pb))?;
        pb.finish();

        let stats = TournamentStats::from_results(&results, &names);
        let (ours, theirs) = (&stats.agent_stats[0], &stats.agent_stats[1]);

        println!(
            "  {}x{}: mean length {:.2} vs {:.2} ({} wins / {} losses / {} draws, {} deaths)",
            size,
            size,
            ours.mean_length(),
            theirs.mean_length(),
            ours.wins.to_string().green(),
            ours.losses.to_string().red(),
            ours.draws.to_string().yellow(),
            ours.ends.deaths()
        );
    }

    println!();
    Ok(())
}
