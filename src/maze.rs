use serde::{Deserialize, Serialize};

use crate::rng::RandomSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

/// Neighbor enumeration order used during carving. Changing it changes every
/// seeded maze, so it is fixed here.
pub const DIRS: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

impl Dir {
    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (-1, 0),
            Dir::Down => (1, 0),
            Dir::Left => (0, -1),
            Dir::Right => (0, 1),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    /// Facing encoding used by the rendering contract:
    /// 0 right, 1 down, 2 left, 3 up.
    pub fn facing_index(self) -> u8 {
        match self {
            Dir::Right => 0,
            Dir::Down => 1,
            Dir::Left => 2,
            Dir::Up => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Walls {
    pub fn sealed() -> Self {
        Self {
            top: true,
            right: true,
            bottom: true,
            left: true,
        }
    }

    pub fn has(self, dir: Dir) -> bool {
        match dir {
            Dir::Up => self.top,
            Dir::Down => self.bottom,
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    fn clear(&mut self, dir: Dir) {
        match dir {
            Dir::Up => self.top = false,
            Dir::Down => self.bottom = false,
            Dir::Left => self.left = false,
            Dir::Right => self.right = false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub walls: Walls,
    pub visited: bool,
    pub is_start: bool,
    pub is_end: bool,
}

impl Cell {
    fn new(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            walls: Walls::sealed(),
            visited: false,
            is_start: false,
            is_end: false,
        }
    }
}

/// Square grid of wall-flag cells. Once carved, the open passages form a
/// spanning tree: every cell reachable, exactly one simple path between any
/// two cells.
#[derive(Clone, Debug)]
pub struct Maze {
    size: usize,
    cells: Vec<Vec<Cell>>,
}

impl Maze {
    /// Carve a perfect maze of `size x size` cells with randomized iterative
    /// depth-first search. Sizes below 2 are clamped to 2.
    pub fn generate(size: usize, random: &mut RandomSource) -> Maze {
        let size = size.max(2);
        let mut cells: Vec<Vec<Cell>> = (0..size)
            .map(|row| (0..size).map(|col| Cell::new(row, col)).collect())
            .collect();

        let mut stack: Vec<(usize, usize)> = Vec::with_capacity(size * size);
        cells[0][0].visited = true;
        stack.push((0, 0));

        while let Some(&(row, col)) = stack.last() {
            let neighbors = unvisited_neighbors(&cells, size, row, col);
            if neighbors.is_empty() {
                stack.pop();
                continue;
            }
            let (nrow, ncol, dir) = neighbors[random.below(neighbors.len())];
            cells[row][col].walls.clear(dir);
            cells[nrow][ncol].walls.clear(dir.opposite());
            cells[nrow][ncol].visited = true;
            stack.push((nrow, ncol));
        }

        cells[0][0].is_start = true;
        cells[size - 1][size - 1].is_end = true;

        Maze { size, cells }
    }

    /// Wrap an externally supplied square grid (imported custom levels).
    /// The caller has already validated the shape.
    pub fn from_cells(cells: Vec<Vec<Cell>>) -> Maze {
        let size = cells.len();
        Maze { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[row][col]
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn start(&self) -> (usize, usize) {
        self.position_of(|c| c.is_start).unwrap_or((0, 0))
    }

    pub fn end(&self) -> (usize, usize) {
        self.position_of(|c| c.is_end)
            .unwrap_or((self.size - 1, self.size - 1))
    }

    fn position_of(&self, pred: impl Fn(&Cell) -> bool) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .flatten()
            .find(|c| pred(c))
            .map(|c| (c.row, c.col))
    }

    /// Grid neighbor in `dir`, or `None` at the boundary.
    pub fn neighbor(&self, row: usize, col: usize, dir: Dir) -> Option<(usize, usize)> {
        let (dr, dc) = dir.delta();
        let nrow = row.checked_add_signed(dr)?;
        let ncol = col.checked_add_signed(dc)?;
        if nrow >= self.size || ncol >= self.size {
            return None;
        }
        Some((nrow, ncol))
    }
}

fn unvisited_neighbors(
    cells: &[Vec<Cell>],
    size: usize,
    row: usize,
    col: usize,
) -> Vec<(usize, usize, Dir)> {
    let mut out = Vec::with_capacity(4);
    for dir in DIRS {
        let (dr, dc) = dir.delta();
        let (Some(nrow), Some(ncol)) = (row.checked_add_signed(dr), col.checked_add_signed(dc))
        else {
            continue;
        };
        if nrow >= size || ncol >= size {
            continue;
        }
        if !cells[nrow][ncol].visited {
            out.push((nrow, ncol, dir));
        }
    }
    out
}
