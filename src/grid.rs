//! Tile grid: symbols, coordinates, random generation and collapse/refill.

use rand::Rng;
use rand::distributions::{Distribution, Standard};
use std::fmt;
use std::ops::Index;

/// Fruit symbols (fixed palette of 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Apple,
    Mango,
    Blueberry,
    Tangerine,
    Strawberry,
    Pear,
}

impl Symbol {
    pub const ALL: [Self; 6] = [
        Self::Apple,
        Self::Mango,
        Self::Blueberry,
        Self::Tangerine,
        Self::Strawberry,
        Self::Pear,
    ];

    /// Palette index 0..6, used for theme colours.
    pub fn index(&self) -> u8 {
        match self {
            Self::Apple => 0,
            Self::Mango => 1,
            Self::Blueberry => 2,
            Self::Tangerine => 3,
            Self::Strawberry => 4,
            Self::Pear => 5,
        }
    }

    /// Emoji glyph (two terminal columns wide).
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Apple => "🍎",
            Self::Mango => "🥭",
            Self::Blueberry => "🫐",
            Self::Tangerine => "🍊",
            Self::Strawberry => "🍓",
            Self::Pear => "🍐",
        }
    }

    /// Single-letter fallback for terminals without emoji.
    pub fn letter(&self) -> &'static str {
        match self {
            Self::Apple => "A",
            Self::Mango => "M",
            Self::Blueberry => "B",
            Self::Tangerine => "T",
            Self::Strawberry => "S",
            Self::Pear => "P",
        }
    }
}

impl Distribution<Symbol> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Symbol {
        Symbol::ALL[rng.gen_range(0..Symbol::ALL.len())]
    }
}

/// Single cell: empty or holding a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Tile(Symbol),
}

impl Cell {
    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            Self::Tile(s) => Some(*s),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// (row, col); row 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance.
    pub fn distance(&self, other: Coord) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Cell directly above (towards row 0), if any.
    pub fn above(&self) -> Option<Coord> {
        self.row.checked_sub(1).map(|row| Coord::new(row, self.col))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Rectangular tile grid. rows[r][c] = cell; rows[0] is top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    /// Fresh grid with every cell an independent uniform symbol.
    pub fn generate<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        assert!(rows > 0 && cols > 0, "grid must be at least 1x1, got {rows}x{cols}");
        let rows = (0..rows)
            .map(|_| (0..cols).map(|_| Cell::Tile(rng.sample(Standard))).collect())
            .collect();
        Self { rows, width: cols }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn contains(&self, at: Coord) -> bool {
        at.row < self.height() && at.col < self.width
    }

    #[inline]
    pub fn get(&self, at: Coord) -> Option<Cell> {
        self.rows.get(at.row).and_then(|row| row.get(at.col)).copied()
    }

    fn set(&mut self, at: Coord, cell: Cell) {
        self.assert_contains(at);
        self.rows[at.row][at.col] = cell;
    }

    /// Panics on a coordinate outside the grid (caller contract violation).
    pub fn assert_contains(&self, at: Coord) {
        assert!(
            self.contains(at),
            "coordinate {at} outside {}x{} grid",
            self.height(),
            self.width
        );
    }

    /// Rows top to bottom, for rendering.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Number of empty cells (zero outside the middle of a collapse).
    pub fn empty_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_empty()).count()
    }

    /// Clear `a` and `b`, let every column fall, refill the top with new symbols.
    /// Returns how many cells were refilled.
    pub fn collapse<R: Rng + ?Sized>(&mut self, a: Coord, b: Coord, rng: &mut R) -> usize {
        self.set(a, Cell::Empty);
        self.set(b, Cell::Empty);

        let mut refilled = 0;
        for col in 0..self.width {
            let empties = self.settle_column(col);
            for row in 0..empties {
                self.rows[row][col] = Cell::Tile(rng.sample(Standard));
            }
            refilled += empties;
        }
        refilled
    }

    /// Compact non-empty cells of `col` towards the bottom, keeping their order.
    /// Returns the number of empty cells left at the top.
    fn settle_column(&mut self, col: usize) -> usize {
        let mut empties = 0;
        for row in (0..self.height()).rev() {
            match self.rows[row][col] {
                Cell::Empty => empties += 1,
                cell if empties > 0 => {
                    self.rows[row + empties][col] = cell;
                    self.rows[row][col] = Cell::Empty;
                }
                _ => {}
            }
        }
        empties
    }

    #[cfg(test)]
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|r| r.len() == width), "ragged grid");
        Self { rows, width }
    }
}

impl Index<Coord> for Grid {
    type Output = Cell;

    fn index(&self, at: Coord) -> &Cell {
        self.assert_contains(at);
        &self.rows[at.row][at.col]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Build a grid from letters (see `Symbol::letter`); '.' is empty.
    pub(crate) fn grid_from(lines: &[&str]) -> Grid {
        Grid::from_rows(
            lines
                .iter()
                .map(|line| {
                    line.chars()
                        .map(|ch| {
                            Symbol::ALL
                                .iter()
                                .find(|s| s.letter().starts_with(ch))
                                .map_or(Cell::Empty, |s| Cell::Tile(*s))
                        })
                        .collect()
                })
                .collect(),
        )
    }

    fn column(grid: &Grid, col: usize) -> Vec<Cell> {
        (0..grid.height()).map(|row| grid[Coord::new(row, col)]).collect()
    }

    #[test]
    fn test_generate_fills_every_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        for (rows, cols) in [(9, 6), (1, 1), (3, 12)] {
            let grid = Grid::generate(rows, cols, &mut rng);
            assert_eq!(grid.height(), rows);
            assert_eq!(grid.width(), cols);
            assert_eq!(grid.empty_count(), 0);
            assert!(grid.rows().flatten().all(|c| c.symbol().is_some_and(|s| Symbol::ALL.contains(&s))));
        }
    }

    #[test]
    fn test_generate_uses_whole_palette() {
        let mut rng = StdRng::seed_from_u64(42);
        let grid = Grid::generate(20, 20, &mut rng);
        for symbol in Symbol::ALL {
            assert!(grid.rows().flatten().any(|c| c.symbol() == Some(symbol)), "{symbol:?} never drawn");
        }
    }

    #[test]
    fn test_collapse_same_column_shifts_two() {
        let mut grid = grid_from(&["A", "M", "B", "T", "S"]);
        let mut rng = StdRng::seed_from_u64(1);
        let refilled = grid.collapse(Coord::new(1, 0), Coord::new(3, 0), &mut rng);

        assert_eq!(refilled, 2);
        assert_eq!(grid.empty_count(), 0);
        let col = column(&grid, 0);
        // Survivors A, B, S keep their order at the bottom.
        assert_eq!(
            &col[2..],
            &[
                Cell::Tile(Symbol::Apple),
                Cell::Tile(Symbol::Blueberry),
                Cell::Tile(Symbol::Strawberry)
            ]
        );
    }

    #[test]
    fn test_collapse_different_columns() {
        let mut grid = grid_from(&["AMB", "TSP", "MAB"]);
        let before = grid.clone();
        let mut rng = StdRng::seed_from_u64(3);
        grid.collapse(Coord::new(2, 0), Coord::new(1, 2), &mut rng);

        assert_eq!(grid.empty_count(), 0);
        // Column 0: A, T fall one row.
        assert_eq!(grid[Coord::new(1, 0)], before[Coord::new(0, 0)]);
        assert_eq!(grid[Coord::new(2, 0)], before[Coord::new(1, 0)]);
        // Column 1 untouched.
        assert_eq!(column(&grid, 1), column(&before, 1));
        // Column 2: B falls onto the bottom B.
        assert_eq!(grid[Coord::new(1, 2)], before[Coord::new(0, 2)]);
        assert_eq!(grid[Coord::new(2, 2)], before[Coord::new(2, 2)]);
    }

    #[test]
    fn test_collapse_preserves_survivor_order_everywhere() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let mut grid = Grid::generate(9, 6, &mut rng);
            let a = Coord::new(rng.gen_range(0..9), rng.gen_range(0..6));
            let mut b = Coord::new(rng.gen_range(0..9), rng.gen_range(0..6));
            if a == b {
                b = Coord::new((a.row + 1) % 9, a.col);
            }
            let before = grid.clone();
            grid.collapse(a, b, &mut rng);
            assert_eq!(grid.empty_count(), 0);

            for col in 0..6 {
                let survivors: Vec<Cell> = (0..9)
                    .map(|row| Coord::new(row, col))
                    .filter(|&at| at != a && at != b)
                    .map(|at| before[at])
                    .collect();
                let after = column(&grid, col);
                let vacated = 9 - survivors.len();
                assert_eq!(&after[vacated..], survivors.as_slice(), "column {col}");
            }
        }
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_index_out_of_bounds_panics() {
        let grid = grid_from(&["AM"]);
        let _ = grid[Coord::new(0, 2)];
    }

    #[test]
    fn test_coord_helpers() {
        assert_eq!(Coord::new(2, 3).distance(Coord::new(2, 4)), 1);
        assert_eq!(Coord::new(2, 3).distance(Coord::new(4, 3)), 2);
        assert_eq!(Coord::new(0, 3).above(), None);
        assert_eq!(Coord::new(4, 3).above(), Some(Coord::new(3, 3)));
    }
}
