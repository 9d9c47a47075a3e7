//! Training settings read from `COIL_*` environment variables.

use std::str::FromStr;

use coil::{HeuristicKind, OptimizerConfig};
use color_eyre::eyre::{WrapErr, bail};

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSettings {
    pub optimizer: OptimizerConfig,
    /// Print the whole report with its history instead of just the best individual.
    pub full_report: bool,
}

impl TrainingSettings {
    pub fn from_env() -> color_eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> color_eyre::Result<Self> {
        let mut optimizer = OptimizerConfig::default();
        read(&lookup, "COIL_POPULATION", &mut optimizer.population_size)?;
        read(&lookup, "COIL_GENERATIONS", &mut optimizer.generations)?;
        read(&lookup, "COIL_MUTATION_RATE", &mut optimizer.mutation_rate)?;
        read(&lookup, "COIL_ELITISM", &mut optimizer.elitism)?;
        read(&lookup, "COIL_BOARD_SIZE", &mut optimizer.board_size)?;
        read(&lookup, "COIL_GAMES", &mut optimizer.games_per_individual)?;
        read(&lookup, "COIL_TOURNAMENT", &mut optimizer.tournament_size)?;
        read(&lookup, "COIL_SEED", &mut optimizer.seed)?;

        if let Some(raw) = lookup("COIL_HEURISTICS") {
            optimizer.heuristics = match raw.trim().to_ascii_lowercase().as_str() {
                "standard" => HeuristicKind::Standard,
                "extended" => HeuristicKind::Extended,
                other => bail!("COIL_HEURISTICS must be `standard` or `extended`, got `{other}`"),
            };
        }
        if lookup("COIL_THREADS").is_some() {
            let mut threads = 0;
            read(&lookup, "COIL_THREADS", &mut threads)?;
            optimizer.threads = Some(threads);
        }

        let mut full_report = false;
        read(&lookup, "COIL_FULL_REPORT", &mut full_report)?;

        optimizer.validate().wrap_err("invalid training settings")?;
        Ok(Self {
            optimizer,
            full_report,
        })
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) -> color_eyre::Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("{key} has an invalid value `{raw}`"))?;
    }
    Ok(())
}
