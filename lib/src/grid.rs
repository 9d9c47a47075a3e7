use std::fmt;

use ahash::AHashSet;
use color_eyre::eyre::ensure;
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;

/// A cell on the board, addressed as (row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The neighbouring position one step in `direction`.
    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        Self::new(self.row + dr, self.col + dc)
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    /// The four orthogonal neighbours, in `Direction::ALL` order.
    pub fn neighbors(self) -> [Position; 4] {
        Direction::ALL.map(|d| self.step(d))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Enumeration order. Ties in move selection resolve to the earliest entry.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit (row, column) delta. Rows grow downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Empty,
    Border,
    Food,
    Body,
    Head,
}

impl CellKind {
    fn glyph(self) -> char {
        match self {
            CellKind::Empty => '.',
            CellKind::Border => '#',
            CellKind::Food => '*',
            CellKind::Body => 'o',
            CellKind::Head => '@',
        }
    }
}

/// Fixed-size board whose outermost ring is always `Border`.
///
/// The grid is redrawn from scratch on every [`Grid::rebuild`] rather than
/// patched, so it never holds cells left over from a previous tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Creates an empty bordered grid. Anything smaller than 3x3 has no
    /// interior and is rejected.
    pub fn new(rows: usize, cols: usize) -> color_eyre::Result<Self> {
        ensure!(
            rows >= 3 && cols >= 3,
            "grid must be at least 3x3 to hold a playable interior, got {rows}x{cols}"
        );
        ensure!(
            rows <= i32::MAX as usize && cols <= i32::MAX as usize,
            "grid dimensions {rows}x{cols} do not fit into positions"
        );
        let mut grid = Self {
            rows,
            cols,
            cells: vec![CellKind::Empty; rows * cols],
        };
        grid.draw_borders();
        Ok(grid)
    }

    pub fn square(size: usize) -> color_eyre::Result<Self> {
        Self::new(size, size)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < self.rows && (pos.col as usize) < self.cols
    }

    fn index(&self, pos: Position) -> usize {
        assert!(
            self.in_bounds(pos),
            "position {pos} is outside the {}x{} grid",
            self.rows,
            self.cols
        );
        pos.row as usize * self.cols + pos.col as usize
    }

    /// Classification of `pos`.
    ///
    /// # Panics
    /// When `pos` lies outside the grid. Callers check [`Grid::in_bounds`] first.
    pub fn classify(&self, pos: Position) -> CellKind {
        self.cells[self.index(pos)]
    }

    /// Redraws the borders and stamps food, body and head from the given state.
    pub fn rebuild(&mut self, actor: &Actor, food: Option<Position>) {
        self.draw_borders();
        if let Some(food) = food {
            let idx = self.index(food);
            self.cells[idx] = CellKind::Food;
        }
        for &segment in actor.body().iter().skip(1) {
            let idx = self.index(segment);
            self.cells[idx] = CellKind::Body;
        }
        let idx = self.index(actor.head());
        self.cells[idx] = CellKind::Head;
    }

    fn draw_borders(&mut self) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let border = row == 0 || col == 0 || row == self.rows - 1 || col == self.cols - 1;
                self.cells[row * self.cols + col] = if border {
                    CellKind::Border
                } else {
                    CellKind::Empty
                };
            }
        }
    }

    /// Every position with its classification, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Position, CellKind)> + '_ {
        self.cells.iter().enumerate().map(|(idx, &kind)| {
            let pos = Position::new((idx / self.cols) as i32, (idx % self.cols) as i32);
            (pos, kind)
        })
    }

    fn empty_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells()
            .filter(|&(_, kind)| kind == CellKind::Empty)
            .map(|(pos, _)| pos)
    }

    pub fn free_cells(&self) -> AHashSet<Position> {
        self.empty_cells().collect()
    }

    /// Uniformly random `Empty` cell, or `None` once the board is full.
    ///
    /// Candidates are drawn in row-major order so a seeded `rng` always picks
    /// the same cell.
    pub fn random_free_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Position> {
        let free: Vec<Position> = self.empty_cells().collect();
        free.choose(rng).copied()
    }

    /// Steps from `pos` to the nearest border ring cell along a row or column.
    pub fn border_distance(&self, pos: Position) -> i32 {
        let bottom = self.rows as i32 - 1 - pos.row;
        let right = self.cols as i32 - 1 - pos.col;
        pos.row.min(pos.col).min(bottom).min(right)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.rows as f64 - 1.0) / 2.0,
            (self.cols as f64 - 1.0) / 2.0,
        )
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols) {
            let line: String = row.iter().map(|kind| kind.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn border_ring(grid: &Grid) -> Vec<Position> {
        grid.cells()
            .map(|(pos, _)| pos)
            .filter(|pos| {
                pos.row == 0
                    || pos.col == 0
                    || pos.row == grid.rows() as i32 - 1
                    || pos.col == grid.cols() as i32 - 1
            })
            .collect()
    }

    #[test]
    fn test_border_ring_is_always_border() {
        for (rows, cols) in [(3, 3), (4, 7), (10, 10), (25, 12)] {
            let mut grid = Grid::new(rows, cols).unwrap();
            for pos in border_ring(&grid) {
                assert_eq!(grid.classify(pos), CellKind::Border, "{pos} on {rows}x{cols}");
            }

            let actor = Actor::new(Position::new(1, 1));
            grid.rebuild(&actor, Some(Position::new(rows as i32 - 2, cols as i32 - 2)));
            for pos in border_ring(&grid) {
                assert_eq!(grid.classify(pos), CellKind::Border);
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_dimensions() {
        assert!(Grid::new(2, 10).is_err());
        assert!(Grid::new(10, 0).is_err());
        assert!(Grid::new(3, 3).is_ok());
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_classify_out_of_bounds_panics() {
        let grid = Grid::square(5).unwrap();
        grid.classify(Position::new(5, 0));
    }

    #[test]
    fn test_rebuild_stamps_actor_and_food() {
        let mut grid = Grid::square(6).unwrap();
        let actor = Actor::from_body([
            Position::new(2, 2),
            Position::new(2, 1),
            Position::new(1, 1),
        ]);
        grid.rebuild(&actor, Some(Position::new(4, 4)));

        assert_eq!(grid.classify(Position::new(2, 2)), CellKind::Head);
        assert_eq!(grid.classify(Position::new(2, 1)), CellKind::Body);
        assert_eq!(grid.classify(Position::new(1, 1)), CellKind::Body);
        assert_eq!(grid.classify(Position::new(4, 4)), CellKind::Food);
        assert_eq!(grid.free_cells().len(), 16 - 4);

        // A redraw forgets the previous tick entirely.
        let moved = Actor::new(Position::new(3, 3));
        grid.rebuild(&moved, None);
        assert_eq!(grid.classify(Position::new(2, 2)), CellKind::Empty);
        assert_eq!(grid.free_cells().len(), 15);
    }

    #[test]
    fn test_random_free_cell_avoids_actor() {
        let mut grid = Grid::square(5).unwrap();
        let actor = Actor::from_body([
            Position::new(1, 1),
            Position::new(1, 2),
            Position::new(1, 3),
            Position::new(2, 3),
            Position::new(2, 2),
            Position::new(2, 1),
            Position::new(3, 1),
            Position::new(3, 2),
        ]);
        grid.rebuild(&actor, None);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(grid.random_free_cell(&mut rng), Some(Position::new(3, 3)));
        }
    }

    #[test]
    fn test_random_free_cell_on_full_board() {
        let mut grid = Grid::square(3).unwrap();
        grid.rebuild(&Actor::new(Position::new(1, 1)), None);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(grid.random_free_cell(&mut rng), None);
    }

    #[test]
    fn test_border_distance_and_center() {
        let grid = Grid::square(10).unwrap();
        assert_eq!(grid.border_distance(Position::new(1, 1)), 1);
        assert_eq!(grid.border_distance(Position::new(4, 5)), 4);
        assert_eq!(grid.border_distance(Position::new(8, 4)), 1);
        assert_eq!(grid.center(), (4.5, 4.5));
    }

    #[test]
    fn test_direction_opposites_and_deltas() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (dr, dc) = dir.delta();
            let (or, oc) = dir.opposite().delta();
            assert_eq!((dr + or, dc + oc), (0, 0));
            assert_eq!(dr.abs() + dc.abs(), 1);
        }
        assert_eq!(Position::new(3, 3).step(Direction::Up), Position::new(2, 3));
        assert_eq!(Position::new(3, 3).step(Direction::Right), Position::new(3, 4));
    }

    #[test]
    fn test_display_renders_glyphs() {
        let mut grid = Grid::square(4).unwrap();
        grid.rebuild(
            &Actor::from_body([Position::new(1, 1), Position::new(2, 1)]),
            Some(Position::new(2, 2)),
        );
        assert_eq!(grid.to_string(), "####\n#@.#\n#o*#\n####\n");
    }
}
