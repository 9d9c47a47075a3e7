//! Headless game loop: one episode from spawn to the first terminal condition.

use ahash::AHashSet;
use color_eyre::eyre::ensure;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Actor, Agent, Direction, GameView, Grid, Position, grid::CellKind};

/// Where every episode spawns its single-segment actor.
pub const SPAWN: Position = Position::new(1, 1);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Side length of the square board, border ring included.
    pub board_size: usize,
    /// Ticks after which the episode is cut off.
    pub max_steps: usize,
}

impl EpisodeConfig {
    /// Square board of `board_size` with the default cap of `2 * size²` steps.
    pub fn new(board_size: usize) -> Self {
        Self {
            board_size,
            max_steps: 2 * board_size * board_size,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn validate(&self) -> color_eyre::Result<()> {
        ensure!(
            self.board_size >= 4,
            "board size must be at least 4 to leave room beside the spawn cell, got {}",
            self.board_size
        );
        ensure!(self.max_steps > 0, "max_steps must be positive");
        Ok(())
    }
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The head left the playable area.
    Wall,
    /// The head ran into the body.
    SelfCollision,
    /// The exact body layout repeated, so the game would cycle forever.
    Looped,
    StepCap,
    /// No free cell is left for food: the board is won.
    BoardFull,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub length: usize,
    pub steps: usize,
    pub food_eaten: usize,
    pub end: EndReason,
}

pub struct Episode {
    config: EpisodeConfig,
    grid: Grid,
    actor: Actor,
    food: Position,
    previous: Option<Direction>,
    steps: usize,
    food_eaten: usize,
    seen: AHashSet<Vec<Position>>,
    rng: StdRng,
}

impl Episode {
    /// Spawns the actor and places the first food. All randomness, the
    /// agent's included, comes from `seed`.
    pub fn new(config: EpisodeConfig, seed: u64) -> color_eyre::Result<Self> {
        config.validate()?;
        let mut grid = Grid::square(config.board_size)?;
        let actor = Actor::new(SPAWN);
        let mut rng = StdRng::seed_from_u64(seed);

        grid.rebuild(&actor, None);
        let food = grid
            .random_free_cell(&mut rng)
            .ok_or_else(|| color_eyre::eyre::eyre!("no free cell for the first food"))?;
        grid.rebuild(&actor, Some(food));

        Ok(Self {
            config,
            grid,
            actor,
            food,
            previous: None,
            steps: 0,
            food_eaten: 0,
            seen: AHashSet::new(),
            rng,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn food(&self) -> Position {
        self.food
    }

    pub fn previous(&self) -> Option<Direction> {
        self.previous
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Plays one tick. Returns the reason the episode ended, if it did.
    pub fn tick(&mut self, agent: &dyn Agent) -> Option<EndReason> {
        let view = GameView {
            grid: &self.grid,
            actor: &self.actor,
            food: self.food,
            previous: self.previous,
        };
        let direction = agent.choose_move(&view, &mut self.rng);

        let next = self.actor.next_head(direction);
        if self.actor.would_collide_with_self(direction) {
            return Some(EndReason::SelfCollision);
        }
        if !self.grid.in_bounds(next) || self.grid.classify(next) == CellKind::Border {
            return Some(EndReason::Wall);
        }

        self.actor.advance(direction);
        self.previous = Some(direction);
        self.steps += 1;

        if self.actor.head() == self.food {
            self.actor.grow();
            self.food_eaten += 1;
            self.grid.rebuild(&self.actor, None);
            match self.grid.random_free_cell(&mut self.rng) {
                Some(food) => self.food = food,
                None => return Some(EndReason::BoardFull),
            }
            trace!(length = self.actor.len(), food = %self.food, "ate");
        }
        self.grid.rebuild(&self.actor, Some(self.food));

        if !self.seen.insert(self.actor.body().iter().copied().collect()) {
            return Some(EndReason::Looped);
        }
        if self.steps >= self.config.max_steps {
            return Some(EndReason::StepCap);
        }
        None
    }

    /// Plays until a terminal condition.
    pub fn run(mut self, agent: &dyn Agent) -> EpisodeOutcome {
        let end = loop {
            if let Some(end) = self.tick(agent) {
                break end;
            }
        };
        // Growth still pending from the final meal counts towards the length.
        let length = self.actor.len() + usize::from(self.actor.has_pending_growth());
        EpisodeOutcome {
            length,
            steps: self.steps,
            food_eaten: self.food_eaten,
            end,
        }
    }
}
