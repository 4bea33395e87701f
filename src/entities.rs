use crate::maze::Maze;
use crate::rng::RandomSource;

pub const COIN_CHANCE: f64 = 0.1;
pub const MOVING_WALL_LENGTH: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Coin {
    pub row: usize,
    pub col: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerUpKind {
    Speed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerUp {
    pub row: usize,
    pub col: usize,
    pub kind: PowerUpKind,
}

/// Oscillating hazard occupying `length` contiguous cells along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovingWall {
    pub row: usize,
    pub col: usize,
    pub direction: i32,
    pub length: usize,
    pub is_vertical: bool,
}

impl MovingWall {
    pub fn occupies(&self, row: usize, col: usize) -> bool {
        if self.is_vertical {
            col == self.col && row >= self.row && row < self.row + self.length
        } else {
            row == self.row && col >= self.col && col < self.col + self.length
        }
    }

    /// Advance the leading coordinate one cell, bouncing off the interior
    /// margin `[1, grid_size - length]`.
    pub fn advance(&mut self, grid_size: usize) {
        let bound = grid_size.saturating_sub(self.length);
        let lead = if self.is_vertical {
            &mut self.row
        } else {
            &mut self.col
        };
        *lead = lead.saturating_add_signed(self.direction as isize);
        if *lead <= 1 || *lead >= bound {
            self.direction = -self.direction;
        }
    }
}

/// One coin draw per cell in row-major order; start and end never hold one.
pub fn scatter_coins(maze: &Maze, random: &mut RandomSource) -> Vec<Coin> {
    let mut coins = Vec::new();
    for row in maze.rows() {
        for cell in row {
            if random.chance(COIN_CHANCE) && !cell.is_start && !cell.is_end {
                coins.push(Coin {
                    row: cell.row,
                    col: cell.col,
                });
            }
        }
    }
    coins
}

/// A single speed power-up on an interior cell, only on grids large enough
/// to make the detour worth it.
pub fn place_power_up(grid_size: usize, random: &mut RandomSource) -> Option<PowerUp> {
    if grid_size <= 10 {
        return None;
    }
    Some(PowerUp {
        row: random.in_band(1, grid_size - 2),
        col: random.in_band(1, grid_size - 2),
        kind: PowerUpKind::Speed,
    })
}

/// `floor(grid_size / 5)` horizontal then as many vertical hazards, all of
/// length 2, starting in the `+1` direction.
pub fn place_moving_walls(grid_size: usize, random: &mut RandomSource) -> Vec<MovingWall> {
    let count = grid_size / 5;
    let mut walls = Vec::with_capacity(count * 2);
    for _ in 0..count {
        walls.push(MovingWall {
            row: random.in_band(1, grid_size - 2),
            col: random.in_band(2, grid_size - 4),
            direction: 1,
            length: MOVING_WALL_LENGTH,
            is_vertical: false,
        });
    }
    for _ in 0..count {
        walls.push(MovingWall {
            row: random.in_band(2, grid_size - 4),
            col: random.in_band(1, grid_size - 2),
            direction: 1,
            length: MOVING_WALL_LENGTH,
            is_vertical: true,
        });
    }
    walls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coins_avoid_start_and_end() {
        for seed in 0..20 {
            let mut random = RandomSource::from_seed(Some(seed));
            let maze = Maze::generate(15, &mut random);
            let coins = scatter_coins(&maze, &mut random);
            assert!(!coins.contains(&Coin { row: 0, col: 0 }));
            assert!(!coins.contains(&Coin { row: 14, col: 14 }));
        }
    }

    #[test]
    fn power_up_only_on_large_grids() {
        let mut random = RandomSource::from_seed(Some(5));
        assert!(place_power_up(10, &mut random).is_none());
        let power_up = place_power_up(15, &mut random).expect("grid is large enough");
        assert!((1..=13).contains(&power_up.row));
        assert!((1..=13).contains(&power_up.col));
        assert_eq!(power_up.kind, PowerUpKind::Speed);
    }

    #[test]
    fn moving_wall_counts_and_bands() {
        let mut random = RandomSource::from_seed(Some(9));
        let walls = place_moving_walls(15, &mut random);
        assert_eq!(walls.len(), 6);
        assert_eq!(walls.iter().filter(|w| w.is_vertical).count(), 3);
        for wall in &walls {
            assert_eq!(wall.direction, 1);
            assert_eq!(wall.length, 2);
            if wall.is_vertical {
                assert!((2..=11).contains(&wall.row));
                assert!((1..=13).contains(&wall.col));
            } else {
                assert!((1..=13).contains(&wall.row));
                assert!((2..=11).contains(&wall.col));
            }
        }
        assert!(place_moving_walls(4, &mut random).is_empty());
    }

    #[test]
    fn vertical_wall_occupancy_covers_its_run() {
        let wall = MovingWall {
            row: 3,
            col: 5,
            direction: 1,
            length: 2,
            is_vertical: true,
        };
        assert!(wall.occupies(3, 5));
        assert!(wall.occupies(4, 5));
        assert!(!wall.occupies(5, 5));
        assert!(!wall.occupies(3, 4));
    }

    #[test]
    fn advance_bounces_inside_the_margin() {
        let mut wall = MovingWall {
            row: 2,
            col: 6,
            direction: 1,
            length: 2,
            is_vertical: true,
        };
        for _ in 0..100 {
            wall.advance(10);
            assert!((1..=8).contains(&wall.row));
            assert_eq!(wall.col, 6);
        }
        // It must actually sweep, not park.
        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..40 {
            wall.advance(10);
            seen_low |= wall.row == 1;
            seen_high |= wall.row == 8;
        }
        assert!(seen_low && seen_high);
    }
}
