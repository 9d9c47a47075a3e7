//! Weighted multi-criteria scoring of a simulated post-move state.
//!
//! Every term is an independent scalar [`Heuristic`]; the score is
//! `Σ wᵢ · hᵢ(state)` over the registry, with one exception: a move that lands
//! on the food scores `f64::INFINITY`, whatever the weights say.
//!
//! Terms are oriented so that a positive weight rewards what the term name
//! suggests is good, e.g. `food_distance` yields the negated distance.
//! Food walled off from the new head costs a whole board's worth of cells
//! instead, worse than any distance on that board.
//! `wall_proximity` yields the negated distance to the nearest border, so a
//! positive weight favours hugging walls and a negative one keeps off them.

use std::fmt;

use color_eyre::eyre::ensure;
use serde::{Deserialize, Serialize};

use crate::grid::Position;
use crate::reachability::{Reachability, Snapshot};

/// Everything a heuristic may look at. Heuristics are pure functions of it.
pub struct MoveContext<'a> {
    pub snapshot: &'a Snapshot<'a>,
    pub reach: &'a Reachability,
    pub food: Position,
}

impl MoveContext<'_> {
    fn head(&self) -> Position {
        self.snapshot.actor().head()
    }
}

pub type HeuristicFn = fn(&MoveContext<'_>) -> f64;

/// A named scoring term.
#[derive(Clone, Copy)]
pub struct Heuristic {
    pub name: &'static str,
    pub eval: HeuristicFn,
}

impl fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Heuristic").field(&self.name).finish()
    }
}

impl Heuristic {
    pub const fn new(name: &'static str, eval: HeuristicFn) -> Self {
        Self { name, eval }
    }
}

pub const SPACE: Heuristic = Heuristic::new("space", space);
pub const FOOD_DISTANCE: Heuristic = Heuristic::new("food_distance", food_distance);
pub const WALL_PROXIMITY: Heuristic = Heuristic::new("wall_proximity", wall_proximity);
pub const CENTER_DISTANCE: Heuristic = Heuristic::new("center_distance", center_distance);
pub const ENCLOSURE_RISK: Heuristic = Heuristic::new("enclosure_risk", enclosure_risk);
pub const FREE_NEIGHBORS: Heuristic = Heuristic::new("free_neighbors", free_neighbors);
pub const COMPACTNESS: Heuristic = Heuristic::new("compactness", compactness);
pub const SQUARENESS: Heuristic = Heuristic::new("squareness", squareness);

/// Size of the region reachable from the new head.
fn space(ctx: &MoveContext<'_>) -> f64 {
    ctx.reach.area(ctx.snapshot, ctx.head()) as f64
}

fn food_distance(ctx: &MoveContext<'_>) -> f64 {
    let head = ctx.head();
    if !ctx.reach.region(ctx.snapshot, head).contains(&ctx.food) {
        let grid = ctx.snapshot.grid();
        return -((grid.rows() * grid.cols()) as f64);
    }
    -(head.manhattan(ctx.food) as f64)
}

fn wall_proximity(ctx: &MoveContext<'_>) -> f64 {
    -(ctx.snapshot.grid().border_distance(ctx.head()) as f64)
}

fn center_distance(ctx: &MoveContext<'_>) -> f64 {
    let (center_row, center_col) = ctx.snapshot.grid().center();
    let head = ctx.head();
    -(head.row as f64 - center_row).hypot(head.col as f64 - center_col)
}

/// Penalises regions smaller than twice the body: the snake needs room to
/// uncoil as well as to fit.
fn enclosure_risk(ctx: &MoveContext<'_>) -> f64 {
    let needed = ctx.snapshot.actor().len() * 2;
    let area = ctx.reach.area(ctx.snapshot, ctx.head());
    -(needed.saturating_sub(area) as f64)
}

fn free_neighbors(ctx: &MoveContext<'_>) -> f64 {
    ctx.head()
        .neighbors()
        .into_iter()
        .filter(|&n| ctx.snapshot.is_passable(n))
        .count() as f64
}

/// Number of body-to-body contacts; a tightly coiled body scores high.
fn compactness(ctx: &MoveContext<'_>) -> f64 {
    ctx.snapshot
        .actor()
        .body()
        .iter()
        .map(|segment| {
            segment
                .neighbors()
                .into_iter()
                .filter(|&n| ctx.snapshot.is_occupied(n))
                .count()
        })
        .sum::<usize>() as f64
}

/// Negated difference between the body's bounding-box height and width.
fn squareness(ctx: &MoveContext<'_>) -> f64 {
    let body = ctx.snapshot.actor().body();
    let rows = body.iter().map(|p| p.row);
    let cols = body.iter().map(|p| p.col);
    let height = rows.clone().max().unwrap_or(0) - rows.min().unwrap_or(0) + 1;
    let width = cols.clone().max().unwrap_or(0) - cols.min().unwrap_or(0) + 1;
    -((height - width).abs() as f64)
}

/// An ordered registry of heuristics. Weight vectors are matched by position.
#[derive(Debug, Clone)]
pub struct HeuristicSet {
    terms: Vec<Heuristic>,
}

impl HeuristicSet {
    pub fn new(terms: Vec<Heuristic>) -> Self {
        Self { terms }
    }

    /// space, food distance, wall proximity, center distance, enclosure risk.
    pub fn standard() -> Self {
        Self::new(vec![
            SPACE,
            FOOD_DISTANCE,
            WALL_PROXIMITY,
            CENTER_DISTANCE,
            ENCLOSURE_RISK,
        ])
    }

    /// The standard terms followed by free neighbours, compactness and squareness.
    pub fn extended() -> Self {
        let mut set = Self::standard();
        set.terms.extend([FREE_NEIGHBORS, COMPACTNESS, SQUARENESS]);
        set
    }

    pub fn with(mut self, heuristic: Heuristic) -> Self {
        self.terms.push(heuristic);
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.terms.iter().map(|h| h.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Heuristic> {
        self.terms.iter()
    }
}

/// One coefficient per heuristic term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoringWeights(Vec<f64>);

impl ScoringWeights {
    pub fn new(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    /// A vector of zeros with a single 1.0 at `index`.
    pub fn unit(len: usize, index: usize) -> Self {
        let mut weights = vec![0.0; len];
        weights[index] = 1.0;
        Self(weights)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for ScoringWeights {
    fn from(weights: Vec<f64>) -> Self {
        Self(weights)
    }
}

impl fmt::Display for ScoringWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, w) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{w:.3}")?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    heuristics: HeuristicSet,
    weights: ScoringWeights,
}

impl Evaluator {
    /// Fails when the weight vector's length differs from the number of terms.
    pub fn new(heuristics: HeuristicSet, weights: ScoringWeights) -> color_eyre::Result<Self> {
        check_arity(&heuristics, &weights)?;
        Ok(Self {
            heuristics,
            weights,
        })
    }

    pub fn set_weights(&mut self, weights: ScoringWeights) -> color_eyre::Result<()> {
        check_arity(&self.heuristics, &weights)?;
        self.weights = weights;
        Ok(())
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn heuristics(&self) -> &HeuristicSet {
        &self.heuristics
    }

    /// `(name, weight, term)` triples in registry order.
    pub fn terms(&self) -> impl Iterator<Item = (&'static str, f64, HeuristicFn)> + '_ {
        self.heuristics
            .iter()
            .zip(self.weights.as_slice())
            .map(|(h, &w)| (h.name, w, h.eval))
    }

    pub fn score(&self, ctx: &MoveContext<'_>) -> f64 {
        if ctx.head() == ctx.food {
            return f64::INFINITY;
        }
        self.terms()
            .filter(|&(_, weight, _)| weight != 0.0)
            .map(|(_, weight, eval)| weight * eval(ctx))
            .sum()
    }
}

fn check_arity(heuristics: &HeuristicSet, weights: &ScoringWeights) -> color_eyre::Result<()> {
    ensure!(
        weights.len() == heuristics.len(),
        "expected {} weights ({}), got {}",
        heuristics.len(),
        heuristics.names().collect::<Vec<_>>().join(", "),
        weights.len()
    );
    ensure!(
        weights.as_slice().iter().all(|w| w.is_finite()),
        "weights must be finite, got {weights}"
    );
    Ok(())
}
