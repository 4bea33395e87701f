//! Custom-level file format: the JSON the level editor writes, plus the
//! validation that keeps a malformed file from ever touching a live board.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{Coin, PowerUp, PowerUpKind};
use crate::game::Game;
use crate::maze::{Cell, Maze, Walls};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCell {
    pub walls: Walls,
    pub is_start: bool,
    pub is_end: bool,
    pub has_coin: bool,
    pub has_power_up: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelFile {
    pub grid_size: usize,
    pub maze: Vec<Vec<LevelCell>>,
}

#[derive(Debug)]
pub enum LevelError {
    Parse(serde_json::Error),
    GridTooSmall { size: usize },
    RowCount { expected: usize, found: usize },
    RowWidth { row: usize, expected: usize, found: usize },
    StartCount { found: usize },
    EndCount { found: usize },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Parse(err) => write!(f, "level file is not valid JSON: {err}"),
            LevelError::GridTooSmall { size } => {
                write!(f, "grid size {size} is too small, need at least 2")
            }
            LevelError::RowCount { expected, found } => {
                write!(f, "expected {expected} rows, found {found}")
            }
            LevelError::RowWidth {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} cells, expected {expected}"),
            LevelError::StartCount { found } => {
                write!(f, "expected exactly one start cell, found {found}")
            }
            LevelError::EndCount { found } => {
                write!(f, "expected exactly one end cell, found {found}")
            }
        }
    }
}

impl Error for LevelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LevelError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(err: serde_json::Error) -> Self {
        LevelError::Parse(err)
    }
}

impl LevelFile {
    /// Parse and validate editor output.
    pub fn parse(json: &str) -> Result<LevelFile, LevelError> {
        let level: LevelFile = serde_json::from_str(json)?;
        level.validate()?;
        Ok(level)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        if self.grid_size < 2 {
            return Err(LevelError::GridTooSmall {
                size: self.grid_size,
            });
        }
        if self.maze.len() != self.grid_size {
            return Err(LevelError::RowCount {
                expected: self.grid_size,
                found: self.maze.len(),
            });
        }
        for (row, cells) in self.maze.iter().enumerate() {
            if cells.len() != self.grid_size {
                return Err(LevelError::RowWidth {
                    row,
                    expected: self.grid_size,
                    found: cells.len(),
                });
            }
        }
        let starts = self.count(|c| c.is_start);
        if starts != 1 {
            return Err(LevelError::StartCount { found: starts });
        }
        let ends = self.count(|c| c.is_end);
        if ends != 1 {
            return Err(LevelError::EndCount { found: ends });
        }
        Ok(())
    }

    fn count(&self, pred: impl Fn(&LevelCell) -> bool) -> usize {
        self.maze.iter().flatten().filter(|c| pred(c)).count()
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot the live board into the editor format. `None` before the
    /// first `generate`.
    pub fn capture(game: &Game) -> Option<LevelFile> {
        let maze = game.maze()?;
        let grid_size = maze.size();
        let rows = maze
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| LevelCell {
                        walls: cell.walls,
                        is_start: cell.is_start,
                        is_end: cell.is_end,
                        has_coin: game
                            .coins()
                            .iter()
                            .any(|c| c.row == cell.row && c.col == cell.col),
                        has_power_up: game
                            .power_ups()
                            .iter()
                            .any(|p| p.row == cell.row && p.col == cell.col),
                    })
                    .collect()
            })
            .collect();
        Some(LevelFile {
            grid_size,
            maze: rows,
        })
    }

    /// Install this level as the live board and start playing it.
    /// Imported levels carry no moving walls.
    pub fn install(&self, game: &mut Game) -> Result<(), LevelError> {
        self.validate()?;

        let mut coins = Vec::new();
        let mut power_ups = Vec::new();
        let cells = self
            .maze
            .iter()
            .enumerate()
            .map(|(row, line)| {
                line.iter()
                    .enumerate()
                    .map(|(col, entry)| {
                        if entry.has_coin {
                            coins.push(Coin { row, col });
                        }
                        if entry.has_power_up {
                            power_ups.push(PowerUp {
                                row,
                                col,
                                kind: PowerUpKind::Speed,
                            });
                        }
                        Cell {
                            row,
                            col,
                            walls: entry.walls,
                            visited: true,
                            is_start: entry.is_start,
                            is_end: entry.is_end,
                        }
                    })
                    .collect()
            })
            .collect();

        game.install_board(Maze::from_cells(cells), coins, power_ups);
        Ok(())
    }
}
