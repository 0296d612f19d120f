//! Pair rule: which two tiles may be cleared together.

use crate::grid::{Cell, Coord, Grid};

/// True if `a` and `b` are orthogonal neighbours, or sit in different columns
/// with nothing above either of them.
///
/// The second case is not a path search: any two tiles whose upper neighbour is
/// off the board or empty connect, however far apart.
pub fn is_connectable(grid: &Grid, a: Coord, b: Coord) -> bool {
    grid.assert_contains(a);
    grid.assert_contains(b);
    if a == b {
        return false;
    }
    a.distance(b) == 1 || (a.col != b.col && open_above(grid, a) && open_above(grid, b))
}

/// Connectable, same symbol, neither empty.
pub fn is_valid_match(grid: &Grid, a: Coord, b: Coord) -> bool {
    match (grid[a], grid[b]) {
        (Cell::Tile(x), Cell::Tile(y)) => x == y && is_connectable(grid, a, b),
        _ => false,
    }
}

fn open_above(grid: &Grid, at: Coord) -> bool {
    at.above()
        .and_then(|up| grid.get(up))
        .is_none_or(|cell| cell.is_empty())
}
