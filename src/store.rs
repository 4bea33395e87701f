//! Local progress store: unlocked achievements, story progress, and
//! per-level leaderboards, persisted as one JSON file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

pub const LEADERBOARD_CAP: usize = 10;
pub const MASTERY_KEY: &str = "mastery";

pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const ACHIEVEMENTS: [AchievementDef; 5] = [
    AchievementDef {
        id: "level_1",
        name: "First Steps",
        description: "Complete level 1.",
    },
    AchievementDef {
        id: "level_10",
        name: "Halfway There",
        description: "Complete level 10.",
    },
    AchievementDef {
        id: "level_25",
        name: "Maze Master",
        description: "Complete all 25 levels.",
    },
    AchievementDef {
        id: "no_backtrack",
        name: "Forward Momentum",
        description: "Complete a level without backtracking.",
    },
    AchievementDef {
        id: "all_coins",
        name: "Coin Collector",
        description: "Collect all coins in a level.",
    },
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    #[serde(default)]
    pub unlocked_achievements: BTreeSet<String>,
    #[serde(default)]
    pub maze_progress: u32,
    #[serde(default)]
    pub leaderboards: BTreeMap<String, Vec<ScoreEntry>>,
}

pub struct ProgressStore {
    path: PathBuf,
    pub data: ProgressData,
}

impl ProgressStore {
    /// Load the store at `path`, falling back to an empty one when the file
    /// is missing or unreadable. A broken save file must never stop the
    /// game from starting.
    pub fn open(path: PathBuf) -> Self {
        let data = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(data) => data,
                Err(err) => {
                    warn!("ignoring corrupt progress file {}: {err}", path.display());
                    ProgressData::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => ProgressData::default(),
            Err(err) => {
                warn!("cannot read progress file {}: {err}", path.display());
                ProgressData::default()
            }
        };
        Self { path, data }
    }

    pub fn save(&self) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(&self.data)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(&self.path, raw)
    }

    /// Returns true when the id was not unlocked before.
    pub fn unlock(&mut self, id: &str) -> bool {
        self.data.unlocked_achievements.insert(id.to_string())
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.data.unlocked_achievements.contains(id)
    }

    pub fn set_progress(&mut self, percent: u32) {
        self.data.maze_progress = self.data.maze_progress.max(percent.min(100));
    }

    /// Insert a score into the `key` board, keeping it sorted descending
    /// and capped at the top ten.
    pub fn record_score(&mut self, key: &str, name: &str, score: u32) {
        let board = self.data.leaderboards.entry(key.to_string()).or_default();
        board.push(ScoreEntry {
            name: name.to_string(),
            score,
        });
        board.sort_by(|a, b| b.score.cmp(&a.score));
        board.truncate(LEADERBOARD_CAP);
    }

    pub fn leaderboard(&self, key: &str) -> &[ScoreEntry] {
        self.data
            .leaderboards
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
