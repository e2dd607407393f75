//! The static grid: cell coordinates, 4-neighbour adjacency, and the
//! Manhattan heuristic.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// A cell coordinate into a `Grid`. `(row, col)`.
pub type Cell = (usize, usize);

/// Manhattan distance between two cells; admissible and consistent for a
/// 4-connected unit-cost grid.
pub fn manhattan(a: Cell, b: Cell) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// A rectangular grid of static obstacles. Immutable for the lifetime of
/// any planning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    height: usize,
    width: usize,
    /// Row-major; `true` marks a static obstacle.
    blocked: Vec<Vec<bool>>,
}

impl Grid {
    /// Builds a grid from a row-major obstacle matrix. Panics if rows are
    /// not all the same length.
    pub fn new(blocked: Vec<Vec<bool>>) -> Self {
        let height = blocked.len();
        let width = blocked.first().map_or(0, Vec::len);
        assert!(
            blocked.iter().all(|row| row.len() == width),
            "grid rows must all share one width"
        );
        Grid {
            height,
            width,
            blocked,
        }
    }

    /// A square `size x size` grid with no obstacles.
    pub fn empty(size: usize) -> Self {
        Grid::new(vec![vec![false; size]; size])
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Cells outside `[0,height)x[0,width)` are implicitly blocked.
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.0 < self.height && cell.1 < self.width
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        !self.in_bounds(cell) || self.blocked[cell.0][cell.1]
    }

    /// The safe-cell predicate: in bounds and not a static obstacle.
    pub fn is_safe(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.blocked[cell.0][cell.1]
    }

    /// The up-to-four 4-adjacent safe cells of `cell`, in a fixed
    /// N/E/S/W order (wait is not included; callers add it explicitly).
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        const DIRS: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
        DIRS.into_iter().filter_map(move |(dr, dc)| {
            let r = cell.0.checked_add_signed(dr)?;
            let c = cell.1.checked_add_signed(dc)?;
            self.is_safe((r, c)).then_some((r, c))
        })
    }

    /// All non-blocked cells, row-major. Used by the flow solver (§4.6),
    /// which needs the full vertex set `V` up front.
    pub fn safe_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height)
            .flat_map(move |r| (0..self.width).map(move |c| (r, c)))
            .filter(move |&cell| self.is_safe(cell))
    }

    /// Loads a MovingAI-format `.map` file: a `type`/`height`/`width`/`map`
    /// header followed by `height` rows of terrain characters, where `.`
    /// and `G` are passable and anything else is a static obstacle.
    pub fn from_moving_ai_file(path: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let _type = lines.next().ok_or_else(eof)??;
        let height = lines
            .next()
            .ok_or_else(eof)??
            .split_whitespace()
            .last()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing height"))?;
        let width = lines
            .next()
            .ok_or_else(eof)??
            .split_whitespace()
            .last()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing width"))?;
        let _map = lines.next().ok_or_else(eof)??;

        let mut blocked = Vec::with_capacity(height);
        for line in lines.take(height) {
            let row: Vec<bool> = line?
                .chars()
                .map(|ch| !matches!(ch, '.' | 'G'))
                .collect();
            blocked.push(row);
        }

        Ok(Grid::new(blocked))
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated map file")
}
