use crate::reachability::{Reachability, Snapshot};

/// Whether the simulated move in `snapshot` leaves the actor room to live.
///
/// Two checks, both against `body_len`, the length before the move:
/// the region reachable from the new head must be larger than the body, and
/// some other cell of that region must itself reach more than the body. The
/// second check catches heads that split the free space into pockets which
/// only look large together.
pub fn is_safe(snapshot: &Snapshot<'_>, reach: &Reachability, body_len: usize) -> bool {
    let head = snapshot.actor().head();
    let area = reach.region(snapshot, head);
    if area.len() <= body_len {
        return false;
    }

    area.iter()
        .filter(|&&cell| cell != head)
        .any(|&cell| reach.area(snapshot, cell) > body_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::grid::{Direction, Grid, Position};

    /// One epoch per direction, as the decision engine does per candidate.
    fn snapshot_for<'a>(grid: &'a Grid, actor: &Actor, direction: Direction) -> Snapshot<'a> {
        Snapshot::new(grid, actor.moved(direction), direction as u32)
    }

    #[test]
    fn test_open_board_is_safe() {
        let mut grid = Grid::square(8).unwrap();
        let actor = Actor::from_body([Position::new(3, 3), Position::new(3, 2)]);
        grid.rebuild(&actor, Some(Position::new(6, 6)));
        let reach = Reachability::new();
        for dir in [Direction::Up, Direction::Down, Direction::Right] {
            assert!(is_safe(&snapshot_for(&grid, &actor, dir), &reach, actor.len()));
        }
    }

    #[test]
    fn test_pocket_smaller_than_body_is_unsafe() {
        // Head at (3,3) facing a one-cell pocket at (3,4) walled in by its own body.
        let mut grid = Grid::square(7).unwrap();
        let actor = Actor::from_body([
            Position::new(3, 3),
            Position::new(4, 3),
            Position::new(4, 4),
            Position::new(4, 5),
            Position::new(3, 5),
            Position::new(2, 5),
            Position::new(2, 4),
            Position::new(1, 4),
            Position::new(1, 3),
        ]);
        grid.rebuild(&actor, Some(Position::new(5, 5)));
        let reach = Reachability::new();

        assert!(!is_safe(&snapshot_for(&grid, &actor, Direction::Right), &reach, actor.len()));
        assert!(is_safe(&snapshot_for(&grid, &actor, Direction::Left), &reach, actor.len()));
    }

    #[test]
    fn test_region_split_into_small_pockets_is_unsafe() {
        // A 1-wide corridor: moving to its middle leaves 3 cells on each side,
        // 7 in total, which beats a body of 5 only when counted together.
        let mut grid = Grid::new(3, 9).unwrap();
        let actor = Actor::from_body([Position::new(1, 1)]);
        grid.rebuild(&actor, None);
        let reach = Reachability::new();

        let split = Snapshot::new(&grid, Actor::new(Position::new(1, 4)), 0);
        assert_eq!(reach.area(&split, Position::new(1, 4)), 7);
        assert!(!is_safe(&split, &reach, 5));
        assert!(is_safe(&split, &reach, 2));
    }
}
