//! Generational genetic search over scoring weights.
//!
//! Fitness of a weight vector is the mean final length over a fixed set of
//! seeded episodes, so evaluating the same weights twice gives the same number.
//! Episodes of one evaluation run in parallel on the optimizer's own pool; the
//! generation loop itself is sequential.

use std::num::NonZeroUsize;

use color_eyre::eyre::{WrapErr, ensure};
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::episode::{Episode, EpisodeConfig};
use crate::evaluator::{HeuristicSet, ScoringWeights};
use crate::strategy::Strategy;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeuristicKind {
    #[default]
    Standard,
    Extended,
}

impl HeuristicKind {
    pub fn set(self) -> HeuristicSet {
        match self {
            HeuristicKind::Standard => HeuristicSet::standard(),
            HeuristicKind::Extended => HeuristicSet::extended(),
        }
    }
}

/// Raises the mutation rate on long runs, when progress usually stalls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationSchedule {
    /// No adaptation before this generation.
    pub adapt_after: usize,
    pub adapt_every: usize,
    pub step: f64,
    pub max_rate: f64,
}

impl Default for MutationSchedule {
    fn default() -> Self {
        Self {
            adapt_after: 100,
            adapt_every: 50,
            step: 0.01,
            max_rate: 0.2,
        }
    }
}

impl MutationSchedule {
    pub fn next_rate(&self, generation: usize, current: f64) -> f64 {
        if self.adapt_every > 0 && generation > self.adapt_after && generation % self.adapt_every == 0 {
            (current + self.step).min(self.max_rate.max(current))
        } else {
            current
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub population_size: usize,
    pub generations: usize,
    pub mutation_rate: f64,
    pub elitism: usize,
    pub tournament_size: usize,
    pub board_size: usize,
    pub games_per_individual: usize,
    pub heuristics: HeuristicKind,
    /// Seeds both breeding and the simulated episodes.
    pub seed: u64,
    /// Range initial weights are drawn from.
    pub init_range: (f64, f64),
    /// Mutated weights are clamped into this range.
    pub weight_bounds: (f64, f64),
    /// Largest perturbation a single mutation applies.
    pub mutation_step: f64,
    /// How many times a regressing generation is re-bred before the parents are kept.
    pub max_breeding_attempts: usize,
    pub schedule: MutationSchedule,
    /// Worker threads for episode evaluation. `None` uses the available parallelism.
    pub threads: Option<usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 1000,
            mutation_rate: 0.05,
            elitism: 1,
            tournament_size: 5,
            board_size: 10,
            games_per_individual: 15,
            heuristics: HeuristicKind::Standard,
            seed: 0,
            init_range: (0.0, 3.0),
            weight_bounds: (0.0, 10.0),
            mutation_step: 1.0,
            max_breeding_attempts: 10,
            schedule: MutationSchedule::default(),
            threads: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> color_eyre::Result<()> {
        ensure!(self.population_size > 0, "population_size must be positive");
        ensure!(
            self.elitism < self.population_size,
            "elitism ({}) must leave room for offspring in a population of {}",
            self.elitism,
            self.population_size
        );
        ensure!(self.tournament_size > 0, "tournament_size must be positive");
        ensure!(self.games_per_individual > 0, "games_per_individual must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.mutation_rate),
            "mutation_rate must lie in [0, 1], got {}",
            self.mutation_rate
        );
        ensure!(
            self.init_range.0 < self.init_range.1,
            "init_range must be a non-empty interval"
        );
        ensure!(
            self.weight_bounds.0 <= self.weight_bounds.1,
            "weight_bounds must be ordered"
        );
        ensure!(self.max_breeding_attempts > 0, "max_breeding_attempts must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.schedule.max_rate),
            "schedule.max_rate must lie in [0, 1], got {}",
            self.schedule.max_rate
        );
        ensure!(
            self.schedule.step >= 0.0,
            "schedule.step must not be negative, got {}",
            self.schedule.step
        );
        ensure!(self.threads != Some(0), "threads must be positive when set");
        self.episode_config().validate()
    }

    pub fn episode_config(&self) -> EpisodeConfig {
        EpisodeConfig::new(self.board_size)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub weights: ScoringWeights,
    pub fitness: f64,
}

/// Individuals sorted by descending fitness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Population {
    individuals: Vec<Individual>,
}

impl Population {
    pub fn new(mut individuals: Vec<Individual>) -> Self {
        individuals.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        Self { individuals }
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn best(&self) -> Option<&Individual> {
        self.individuals.first()
    }

    pub fn mean_fitness(&self) -> f64 {
        if self.individuals.is_empty() {
            return 0.0;
        }
        self.individuals.iter().map(|i| i.fitness).sum::<f64>() / self.individuals.len() as f64
    }

    fn min_fitness(&self) -> f64 {
        self.individuals.last().map_or(0.0, |i| i.fitness)
    }

    fn max_fitness(&self) -> f64 {
        self.best().map_or(0.0, |i| i.fitness)
    }
}

/// Picks a parent out of the population.
pub trait Selection: Send + Sync {
    fn select<'p>(&self, population: &'p [Individual], rng: &mut dyn RngCore) -> &'p Individual;
}

/// Combines two parents' weights into a child's.
pub trait Crossover: Send + Sync {
    fn cross(&self, a: &ScoringWeights, b: &ScoringWeights, rng: &mut dyn RngCore) -> ScoringWeights;
}

/// Perturbs a child's weights in place with per-gene probability `rate`.
pub trait Mutation: Send + Sync {
    fn mutate(&self, weights: &mut ScoringWeights, rate: f64, rng: &mut dyn RngCore);
}

impl<F> Selection for F
where
    F: for<'p> Fn(&'p [Individual], &mut dyn RngCore) -> &'p Individual + Send + Sync,
{
    fn select<'p>(&self, population: &'p [Individual], rng: &mut dyn RngCore) -> &'p Individual {
        self(population, rng)
    }
}

impl<F> Crossover for F
where
    F: Fn(&ScoringWeights, &ScoringWeights, &mut dyn RngCore) -> ScoringWeights + Send + Sync,
{
    fn cross(&self, a: &ScoringWeights, b: &ScoringWeights, rng: &mut dyn RngCore) -> ScoringWeights {
        self(a, b, rng)
    }
}

impl<F> Mutation for F
where
    F: Fn(&mut ScoringWeights, f64, &mut dyn RngCore) + Send + Sync,
{
    fn mutate(&self, weights: &mut ScoringWeights, rate: f64, rng: &mut dyn RngCore) {
        self(weights, rate, rng)
    }
}

/// Best of `size` individuals sampled uniformly with replacement.
#[derive(Clone, Copy, Debug)]
pub struct Tournament {
    pub size: usize,
}

impl Selection for Tournament {
    fn select<'p>(&self, population: &'p [Individual], rng: &mut dyn RngCore) -> &'p Individual {
        let mut best = &population[rng.random_range(0..population.len())];
        for _ in 1..self.size {
            let contender = &population[rng.random_range(0..population.len())];
            if contender.fitness > best.fitness {
                best = contender;
            }
        }
        best
    }
}

/// Genes before a uniformly random cut come from the first parent, the rest
/// from the second.
#[derive(Clone, Copy, Debug, Default)]
pub struct SinglePoint;

impl Crossover for SinglePoint {
    fn cross(&self, a: &ScoringWeights, b: &ScoringWeights, rng: &mut dyn RngCore) -> ScoringWeights {
        let (a, b) = (a.as_slice(), b.as_slice());
        let cut = rng.random_range(0..a.len().max(1));
        a[..cut].iter().chain(&b[cut..]).copied().collect::<Vec<_>>().into()
    }
}

/// Adds a uniform offset in `[-step, step)` and clamps into `bounds`.
#[derive(Clone, Copy, Debug)]
pub struct Perturb {
    pub step: f64,
    pub bounds: (f64, f64),
}

impl Mutation for Perturb {
    fn mutate(&self, weights: &mut ScoringWeights, rate: f64, rng: &mut dyn RngCore) {
        for gene in weights.as_mut_slice() {
            if rng.random_bool(rate) {
                let offset = if self.step > 0.0 {
                    rng.random_range(-self.step..self.step)
                } else {
                    0.0
                };
                *gene = (*gene + offset).clamp(self.bounds.0, self.bounds.1);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub min_fitness: f64,
    pub mean_fitness: f64,
    pub max_fitness: f64,
    pub best_ever: f64,
    pub mutation_rate: f64,
    /// Whether bred offspring replaced the parents.
    pub accepted: bool,
    pub attempts: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub best: Individual,
    pub history: Vec<GenerationStats>,
    pub population: Population,
}

/// Result of breeding one generation.
#[derive(Clone, Debug)]
pub struct Generation {
    pub population: Population,
    pub accepted: bool,
    pub attempts: usize,
}

pub struct Optimizer {
    config: OptimizerConfig,
    heuristics: HeuristicSet,
    selection: Box<dyn Selection>,
    crossover: Box<dyn Crossover>,
    mutation: Box<dyn Mutation>,
    pool: rayon::ThreadPool,
    rng: StdRng,
}

impl Optimizer {
    /// Validates `config` and sets up tournament selection, single-point
    /// crossover and bounded perturbation.
    pub fn new(config: OptimizerConfig) -> color_eyre::Result<Self> {
        config.validate()?;
        let threads = config.threads.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("episode-{i}"))
            .build()
            .wrap_err("failed to build the episode thread pool")?;
        Ok(Self {
            heuristics: config.heuristics.set(),
            selection: Box::new(Tournament {
                size: config.tournament_size,
            }),
            crossover: Box::new(SinglePoint),
            mutation: Box::new(Perturb {
                step: config.mutation_step,
                bounds: config.weight_bounds,
            }),
            rng: StdRng::seed_from_u64(config.seed ^ 0xB4EE_D5EE_D000_0001),
            pool,
            config,
        })
    }

    pub fn with_selection(mut self, selection: impl Selection + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    pub fn with_crossover(mut self, crossover: impl Crossover + 'static) -> Self {
        self.crossover = Box::new(crossover);
        self
    }

    pub fn with_mutation(mut self, mutation: impl Mutation + 'static) -> Self {
        self.mutation = Box::new(mutation);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn arity(&self) -> usize {
        self.heuristics.len()
    }

    /// Mean final length over `games_per_individual` seeded episodes.
    pub fn evaluate(&self, weights: &ScoringWeights) -> color_eyre::Result<f64> {
        let strategy = Strategy::with_heuristics(self.heuristics.clone(), weights.clone())?;
        let episode = self.config.episode_config();
        let games = self.config.games_per_individual;
        let seed = self.config.seed;

        let lengths: Vec<f64> = self.pool.install(|| {
            (0..games)
                .into_par_iter()
                .map(|game| {
                    let outcome = Episode::new(episode.clone(), episode_seed(seed, game))?.run(&strategy);
                    Ok(outcome.length as f64)
                })
                .collect::<color_eyre::Result<Vec<f64>>>()
        })?;
        Ok(lengths.iter().sum::<f64>() / games as f64)
    }

    fn assess(&self, weights: ScoringWeights) -> color_eyre::Result<Individual> {
        let fitness = self.evaluate(&weights)?;
        Ok(Individual { weights, fitness })
    }

    /// Random weights drawn from `init_range`, evaluated.
    pub fn initial_population(&mut self) -> color_eyre::Result<Population> {
        let (low, high) = self.config.init_range;
        let arity = self.arity();
        let mut individuals = Vec::with_capacity(self.config.population_size);
        for index in 0..self.config.population_size {
            let weights: ScoringWeights = (0..arity)
                .map(|_| self.rng.random_range(low..high))
                .collect::<Vec<_>>()
                .into();
            let individual = self.assess(weights)?;
            debug!(index, fitness = individual.fitness, weights = %individual.weights, "initialised");
            individuals.push(individual);
        }
        Ok(Population::new(individuals))
    }

    fn breed(&mut self, parents: &Population, mutation_rate: f64) -> color_eyre::Result<Population> {
        let mut next: Vec<Individual> = parents
            .individuals()
            .iter()
            .take(self.config.elitism)
            .cloned()
            .collect();
        while next.len() < self.config.population_size {
            let first = self.selection.select(parents.individuals(), &mut self.rng);
            let second = self.selection.select(parents.individuals(), &mut self.rng);
            let mut child = self.crossover.cross(&first.weights, &second.weights, &mut self.rng);
            self.mutation.mutate(&mut child, mutation_rate, &mut self.rng);
            next.push(self.assess(child)?);
        }
        Ok(Population::new(next))
    }

    /// Breeds the next generation from `parents`.
    ///
    /// Offspring replace the parents only when their mean fitness is not
    /// worse. A regressing brood is re-bred from the same parents up to
    /// `max_breeding_attempts` times, after which the parents carry over.
    #[instrument(skip(self, parents), fields(parents_mean = parents.mean_fitness()))]
    pub fn step(&mut self, parents: &Population, mutation_rate: f64) -> color_eyre::Result<Generation> {
        let floor = parents.mean_fitness();
        for attempt in 1..=self.config.max_breeding_attempts {
            let offspring = self.breed(parents, mutation_rate)?;
            let mean = offspring.mean_fitness();
            if mean >= floor {
                return Ok(Generation {
                    population: offspring,
                    accepted: true,
                    attempts: attempt,
                });
            }
            debug!(attempt, mean, floor, "offspring regressed, breeding again");
        }
        Ok(Generation {
            population: parents.clone(),
            accepted: false,
            attempts: self.config.max_breeding_attempts,
        })
    }

    /// Runs the configured number of generations and reports the best
    /// individual ever seen.
    pub fn run(&mut self) -> color_eyre::Result<OptimizationReport> {
        self.run_with(|_| {})
    }

    /// Like [`Optimizer::run`], calling `on_generation` after every generation.
    pub fn run_with(
        &mut self,
        mut on_generation: impl FnMut(&GenerationStats),
    ) -> color_eyre::Result<OptimizationReport> {
        let mut population = self.initial_population()?;
        let mut best = population
            .best()
            .cloned()
            .ok_or_else(|| color_eyre::eyre::eyre!("empty initial population"))?;
        let mut mutation_rate = self.config.mutation_rate;
        let mut history = Vec::with_capacity(self.config.generations);

        for generation in 0..self.config.generations {
            let next_rate = self.config.schedule.next_rate(generation, mutation_rate);
            if next_rate != mutation_rate {
                info!(generation, rate = next_rate, "raising mutation rate");
                mutation_rate = next_rate;
            }

            let outcome = self.step(&population, mutation_rate)?;
            population = outcome.population;

            if let Some(leader) = population.best() {
                if leader.fitness > best.fitness {
                    best = leader.clone();
                    info!(generation, fitness = best.fitness, weights = %best.weights, "new best");
                }
            }

            let stats = GenerationStats {
                generation,
                min_fitness: population.min_fitness(),
                mean_fitness: population.mean_fitness(),
                max_fitness: population.max_fitness(),
                best_ever: best.fitness,
                mutation_rate,
                accepted: outcome.accepted,
                attempts: outcome.attempts,
            };
            info!(
                generation,
                min = stats.min_fitness,
                mean = stats.mean_fitness,
                max = stats.max_fitness,
                accepted = stats.accepted,
                "generation complete"
            );
            on_generation(&stats);
            history.push(stats);
        }

        Ok(OptimizationReport {
            best,
            history,
            population,
        })
    }
}

/// Seed of the `game`-th evaluation episode; shared by every individual.
fn episode_seed(seed: u64, game: usize) -> u64 {
    seed.wrapping_add((game as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> OptimizerConfig {
        OptimizerConfig {
            population_size: 6,
            generations: 2,
            elitism: 3,
            tournament_size: 3,
            board_size: 6,
            games_per_individual: 2,
            max_breeding_attempts: 2,
            seed: 42,
            threads: Some(2),
            ..OptimizerConfig::default()
        }
    }

    fn individual(fitness: f64) -> Individual {
        Individual {
            weights: ScoringWeights::new(vec![fitness; 5]),
            fitness,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(small_config().validate().is_ok());
        for broken in [
            OptimizerConfig { elitism: 6, ..small_config() },
            OptimizerConfig { population_size: 0, ..small_config() },
            OptimizerConfig { tournament_size: 0, ..small_config() },
            OptimizerConfig { games_per_individual: 0, ..small_config() },
            OptimizerConfig { mutation_rate: 1.5, ..small_config() },
            OptimizerConfig { board_size: 2, ..small_config() },
            OptimizerConfig {
                schedule: MutationSchedule {
                    max_rate: 1.5,
                    ..MutationSchedule::default()
                },
                ..small_config()
            },
            OptimizerConfig {
                schedule: MutationSchedule {
                    step: -0.01,
                    ..MutationSchedule::default()
                },
                ..small_config()
            },
        ] {
            assert!(Optimizer::new(broken).is_err());
        }
    }

    #[test]
    fn test_population_sorted_descending() {
        let population = Population::new(vec![individual(1.0), individual(4.0), individual(2.0)]);
        let order: Vec<f64> = population.individuals().iter().map(|i| i.fitness).collect();
        assert_eq!(order, [4.0, 2.0, 1.0]);
        assert_eq!(population.mean_fitness(), 7.0 / 3.0);
    }

    #[test]
    fn test_tournament_of_whole_population_finds_best() {
        let population = [individual(1.0), individual(9.0), individual(3.0)];
        let mut rng = StdRng::seed_from_u64(5);
        let picked = Tournament { size: 64 }.select(&population, &mut rng);
        assert_eq!(picked.fitness, 9.0);
    }

    #[test]
    fn test_single_point_crossover_keeps_prefix_and_suffix() {
        let a = ScoringWeights::new(vec![1.0; 6]);
        let b = ScoringWeights::new(vec![2.0; 6]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let child = SinglePoint.cross(&a, &b, &mut rng);
            let genes = child.as_slice();
            assert_eq!(genes.len(), 6);
            let cut = genes.iter().position(|&g| g == 2.0).unwrap_or(6);
            assert!(genes[..cut].iter().all(|&g| g == 1.0));
            assert!(genes[cut..].iter().all(|&g| g == 2.0));
        }
    }

    #[test]
    fn test_mutation_respects_bounds_and_rate() {
        let mut rng = StdRng::seed_from_u64(8);
        let mutation = Perturb {
            step: 5.0,
            bounds: (0.0, 1.0),
        };
        let mut weights = ScoringWeights::new(vec![0.5; 32]);
        mutation.mutate(&mut weights, 1.0, &mut rng);
        assert!(weights.as_slice().iter().all(|w| (0.0..=1.0).contains(w)));

        let mut untouched = ScoringWeights::new(vec![0.5; 32]);
        mutation.mutate(&mut untouched, 0.0, &mut rng);
        assert_eq!(untouched, ScoringWeights::new(vec![0.5; 32]));
    }

    #[test]
    fn test_schedule_raises_rate_late_and_caps_it() {
        let schedule = MutationSchedule::default();
        assert_eq!(schedule.next_rate(50, 0.05), 0.05);
        assert_eq!(schedule.next_rate(100, 0.05), 0.05);
        assert_eq!(schedule.next_rate(149, 0.05), 0.05);
        assert!((schedule.next_rate(150, 0.05) - 0.06).abs() < 1e-12);
        assert_eq!(schedule.next_rate(200, 0.2), 0.2);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let optimizer = Optimizer::new(small_config()).unwrap();
        let weights = ScoringWeights::new(vec![1.0, 2.0, 0.5, 0.5, 1.0]);
        let first = optimizer.evaluate(&weights).unwrap();
        let second = optimizer.evaluate(&weights).unwrap();
        assert_eq!(first, second);
        assert!(first >= 1.0);
    }

    #[test]
    fn test_elites_survive_every_generation() {
        let mut optimizer = Optimizer::new(small_config()).unwrap();
        let mut population = optimizer.initial_population().unwrap();
        for _ in 0..2 {
            let best = population.best().cloned().unwrap();
            let elites: Vec<Individual> = population.individuals()[..3].to_vec();
            let next = optimizer.step(&population, 0.3).unwrap().population;
            assert_eq!(next.len(), 6);
            assert!(next.individuals().contains(&best));
            for elite in &elites {
                assert!(next.individuals().contains(elite));
            }
            assert!(next.best().unwrap().fitness >= best.fitness);
            population = next;
        }
    }

    #[test]
    fn test_rejected_generation_keeps_parents() {
        // Every child is the zero vector, which never beats a population of champions.
        let mut optimizer = Optimizer::new(OptimizerConfig {
            elitism: 0,
            ..small_config()
        })
        .unwrap()
        .with_crossover(|a: &ScoringWeights, _: &ScoringWeights, _: &mut dyn RngCore| {
            ScoringWeights::new(vec![0.0; a.len()])
        })
        .with_mutation(|_: &mut ScoringWeights, _: f64, _: &mut dyn RngCore| {});
        let champions = Population::new(vec![
            Individual {
                weights: ScoringWeights::new(vec![1.0; 5]),
                fitness: 1_000.0,
            };
            6
        ]);
        let outcome = optimizer.step(&champions, 0.1).unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.population, champions);
    }

    #[test]
    fn test_run_reports_best_ever() {
        let mut optimizer = Optimizer::new(small_config()).unwrap();
        let mut seen = 0;
        let report = optimizer.run_with(|_| seen += 1).unwrap();
        assert_eq!(seen, 2);
        assert_eq!(report.history.len(), 2);
        let best_in_history = report
            .history
            .iter()
            .map(|g| g.max_fitness)
            .fold(f64::MIN, f64::max);
        assert!(report.best.fitness >= best_in_history);
        assert_eq!(report.best.weights.len(), 5);
    }
}
